use anyhow::Result;

/// Maps normalized close windows to probabilities of an upward move.
///
/// Implementations return one probability in `[0, 1]` per window, in input
/// order. The backtest pipeline depends only on this contract, not on how
/// the probabilities are produced.
pub trait Scorer {
    fn score(&self, windows: &[Vec<f32>]) -> Result<Vec<f32>>;
}
