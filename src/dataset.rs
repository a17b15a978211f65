use crate::data::Candle;

/// One training or scoring example: the normalized close window ending just
/// before `index`, and the label for the move `horizon` candles ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub index: usize,
    pub window: Vec<f32>,
    pub label: f32,
}

/// Slices `[start, end)` into samples. The range is clamped so that every
/// window has `window` candles behind it and every label has `horizon`
/// candles ahead of it; a range that clamps away entirely yields no samples.
///
/// Each window is normalized with its own mean and population standard
/// deviation. The label is 1 when the forward return
/// `close[i + horizon] / close[i] - 1` reaches `up_threshold`.
pub fn build_samples(
    candles: &[Candle],
    start: usize,
    end: usize,
    window: usize,
    horizon: usize,
    up_threshold: f64,
) -> Vec<Sample> {
    if window == 0 || horizon == 0 {
        return Vec::new();
    }
    let start = start.max(window);
    let end = end.min(candles.len().saturating_sub(horizon));
    if start >= end {
        return Vec::new();
    }

    let mut samples = Vec::with_capacity(end - start);
    for i in start..end {
        let closes = &candles[i - window..i];
        let mean = closes.iter().map(|c| c.close).sum::<f64>() / window as f64;
        let variance = closes
            .iter()
            .map(|c| {
                let d = c.close - mean;
                d * d
            })
            .sum::<f64>()
            / window as f64;
        // The epsilon keeps constant windows at zero instead of dividing by
        // a zero deviation.
        let std = variance.sqrt() + 1e-12;

        let features = closes
            .iter()
            .map(|c| ((c.close - mean) / std) as f32)
            .collect();

        let forward_return = candles[i + horizon].close / candles[i].close - 1.0;
        let label = if forward_return >= up_threshold {
            1.0
        } else {
            0.0
        };

        samples.push(Sample {
            index: i,
            window: features,
            label,
        });
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: i as i64,
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect()
    }

    #[test]
    fn labels_follow_the_forward_return() {
        let candles =
            candles_from_closes(&[100.0, 100.0, 100.0, 100.0, 101.0, 103.0, 99.0, 98.0]);
        let samples = build_samples(&candles, 2, candles.len(), 2, 1, 0.0);

        let indices: Vec<usize> = samples.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![2, 3, 4, 5, 6]);

        let labels: Vec<f32> = samples.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn windows_never_see_current_or_future_candles() {
        let base: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let mut shifted = base.clone();
        for close in shifted.iter_mut().skip(4) {
            *close += 1000.0;
        }

        let a = build_samples(&candles_from_closes(&base), 0, 5, 3, 1, 0.0);
        let b = build_samples(&candles_from_closes(&shifted), 0, 5, 3, 1, 0.0);

        let sample_a = a.iter().find(|s| s.index == 4).unwrap();
        let sample_b = b.iter().find(|s| s.index == 4).unwrap();
        assert_eq!(sample_a.window, sample_b.window);
    }

    #[test]
    fn range_is_clamped_to_valid_windows_and_horizons() {
        let candles = candles_from_closes(&[1.0; 10]);
        let samples = build_samples(&candles, 0, 100, 3, 2, 0.0);

        assert_eq!(samples.first().unwrap().index, 3);
        assert_eq!(samples.last().unwrap().index, 7);
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.window.len() == 3));
    }

    #[test]
    fn degenerate_parameters_yield_no_samples() {
        let candles = candles_from_closes(&[1.0; 10]);
        assert!(build_samples(&candles, 0, 10, 0, 1, 0.0).is_empty());
        assert!(build_samples(&candles, 0, 10, 2, 0, 0.0).is_empty());
        assert!(build_samples(&candles, 5, 5, 2, 1, 0.0).is_empty());
        assert!(build_samples(&candles, 9, 4, 2, 1, 0.0).is_empty());
        assert!(build_samples(&[], 0, 10, 2, 1, 0.0).is_empty());
    }

    #[test]
    fn constant_windows_normalize_to_zero() {
        let candles = candles_from_closes(&[100.0; 8]);
        let samples = build_samples(&candles, 0, 8, 4, 1, 0.0);
        assert!(!samples.is_empty());
        for sample in &samples {
            assert!(sample.window.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn normalization_uses_the_population_deviation() {
        // Window [1, 3]: mean 2, population variance ((-1)^2 + 1^2) / 2 = 1.
        let candles = candles_from_closes(&[1.0, 3.0, 10.0, 10.0]);
        let samples = build_samples(&candles, 2, 3, 2, 1, 0.0);
        assert_eq!(samples.len(), 1);

        let window = &samples[0].window;
        assert!((window[0] + 1.0).abs() < 1e-6);
        assert!((window[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn threshold_comparison_is_inclusive() {
        // Forward return at i=2 is exactly 0.5.
        let candles = candles_from_closes(&[10.0, 10.0, 10.0, 15.0]);
        let samples = build_samples(&candles, 2, 3, 2, 1, 0.5);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, 1.0);
    }
}
