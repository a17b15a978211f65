use candle_core::{Tensor, backprop::GradStore};
use candle_nn::{Optimizer, VarMap, loss, ops};
use rand::{rng, seq::SliceRandom};

use crate::config::Config;
use crate::dataset::Sample;
use crate::device::DEVICE;
use crate::mlp::MultiLayerPerceptron;
use crate::scorer::Scorer;

const MAX_GRAD_NORM: f32 = 1.0;

/// Rescales every gradient in `grad_store` so the global norm stays at or
/// below `max_norm`. Returns the pre-clip norm.
fn clip_gradients(
    grad_store: &mut GradStore,
    var_map: &VarMap,
    max_norm: f32,
) -> Result<f32, candle_core::Error> {
    let mut total_norm_sq: f32 = 0.0;
    let mut grads = vec![];

    for var in var_map.all_vars() {
        let tensor = var.as_tensor();
        if let Some(grad) = grad_store.get(tensor) {
            let norm_sq = grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            total_norm_sq += norm_sq;
            grads.push((var, grad.clone()));
        }
    }

    let total_norm = total_norm_sq.sqrt();
    if total_norm > max_norm {
        let scale = max_norm / total_norm;
        for (var, grad) in grads {
            let tensor = var.as_tensor();
            let scale_t = Tensor::new(scale, tensor.device())?;
            let clipped = grad.broadcast_mul(&scale_t)?;
            grad_store.insert(tensor, clipped);
        }
    }

    Ok(total_norm)
}

/// Binary classifier over normalized close windows: an MLP trained with
/// BCE-with-logits whose sigmoid output is the probability of a rise.
pub struct RiseClassifier {
    net: MultiLayerPerceptron,
    window: usize,
    batch_size: usize,
}

impl RiseClassifier {
    pub fn new(config: &Config) -> Result<Self, candle_core::Error> {
        let mut topology = Vec::with_capacity(config.layers + 2);
        topology.push(config.window);
        for _ in 0..config.layers {
            topology.push(config.hidden);
        }
        topology.push(1);

        Ok(Self {
            net: MultiLayerPerceptron::new(&topology, config.learning_rate, config.weight_decay)?,
            window: config.window,
            batch_size: config.batch_size.max(1),
        })
    }

    fn batch_tensors(&self, batch: &[&Sample]) -> Result<(Tensor, Tensor), candle_core::Error> {
        let mut features: Vec<f32> = Vec::with_capacity(batch.len() * self.window);
        let mut labels: Vec<f32> = Vec::with_capacity(batch.len());
        for sample in batch {
            assert_eq!(sample.window.len(), self.window);
            features.extend_from_slice(&sample.window);
            labels.push(sample.label);
        }
        let inputs = Tensor::from_vec(features, (batch.len(), self.window), &DEVICE)?;
        let targets = Tensor::from_vec(labels, (batch.len(), 1), &DEVICE)?;
        Ok((inputs, targets))
    }

    /// Trains on shuffled minibatches, printing the mean loss per epoch.
    /// An empty sample set is a no-op.
    pub fn fit(&mut self, samples: &[Sample], epochs: usize) -> Result<(), candle_core::Error> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut rng = rng();

        for epoch in 1..=epochs {
            order.shuffle(&mut rng);
            let mut loss_sum = 0.0f32;
            let mut batches = 0usize;

            for chunk in order.chunks(self.batch_size) {
                let batch: Vec<&Sample> = chunk.iter().map(|&i| &samples[i]).collect();
                let (inputs, targets) = self.batch_tensors(&batch)?;

                let logits = self.net.output(inputs)?;
                let loss = loss::binary_cross_entropy_with_logit(&logits, &targets)?;

                let mut grads = loss.backward()?;
                clip_gradients(&mut grads, &self.net.var_map, MAX_GRAD_NORM)?;
                self.net.optimiser.step(&grads)?;

                loss_sum += loss.to_scalar::<f32>()?;
                batches += 1;
            }

            println!("Epoch {} loss={:.6}", epoch, loss_sum / batches as f32);
        }
        Ok(())
    }
}

impl Scorer for RiseClassifier {
    fn score(&self, windows: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
        let mut probabilities = Vec::with_capacity(windows.len());

        for chunk in windows.chunks(self.batch_size) {
            let mut features: Vec<f32> = Vec::with_capacity(chunk.len() * self.window);
            for window in chunk {
                assert_eq!(window.len(), self.window);
                features.extend_from_slice(window);
            }
            let inputs = Tensor::from_vec(features, (chunk.len(), self.window), &DEVICE)?;
            let logits = self.net.output(inputs)?;
            let probs = ops::sigmoid(&logits)?;
            probabilities.extend(probs.squeeze(1)?.to_vec1::<f32>()?);
        }

        Ok(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(window: usize) -> Config {
        Config {
            window,
            hidden: 8,
            layers: 1,
            batch_size: 4,
            ..Config::default()
        }
    }

    #[test]
    fn score_returns_one_probability_per_window() {
        let classifier = RiseClassifier::new(&small_config(4)).unwrap();
        let windows = vec![
            vec![0.0; 4],
            vec![1.0, -1.0, 0.5, -0.5],
            vec![2.0, 2.0, -2.0, -2.0],
        ];
        let probs = classifier.score(&windows).unwrap();
        assert_eq!(probs.len(), 3);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn score_of_nothing_is_nothing() {
        let classifier = RiseClassifier::new(&small_config(4)).unwrap();
        assert!(classifier.score(&[]).unwrap().is_empty());
    }

    #[test]
    fn fit_runs_on_a_tiny_dataset() {
        let mut classifier = RiseClassifier::new(&small_config(2)).unwrap();
        let samples = vec![
            Sample {
                index: 2,
                window: vec![1.0, 1.0],
                label: 1.0,
            },
            Sample {
                index: 3,
                window: vec![-1.0, -1.0],
                label: 0.0,
            },
            Sample {
                index: 4,
                window: vec![0.5, 1.5],
                label: 1.0,
            },
            Sample {
                index: 5,
                window: vec![-0.5, -1.5],
                label: 0.0,
            },
        ];
        classifier.fit(&samples, 2).unwrap();
    }

    #[test]
    fn fit_on_no_samples_is_a_no_op() {
        let mut classifier = RiseClassifier::new(&small_config(3)).unwrap();
        classifier.fit(&[], 3).unwrap();
    }
}
