//! Evaluation metrics.

use candle_core::{Result, Tensor, D};
use parking_lot::Mutex;

/// Running categorical accuracy over argmaxed logits.
///
/// The counts sit behind a `parking_lot::Mutex` so updates can happen on the
/// `&self` forward path while keeping the model `Send + Sync`.
#[derive(Default)]
pub struct CategoricalAccuracy {
    counts: Mutex<Counts>,
}

#[derive(Default, Clone, Copy)]
struct Counts {
    correct: usize,
    total: usize,
}

impl CategoricalAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `(batch, classes)` logits against `(batch,)` gold labels.
    pub fn update(&self, logits: &Tensor, labels: &Tensor) -> Result<()> {
        let predictions: Vec<u32> = logits.argmax(D::Minus1)?.to_vec1()?;
        let gold: Vec<u32> = labels.to_vec1()?;
        let mut counts = self.counts.lock();
        counts.total += gold.len();
        counts.correct += predictions
            .iter()
            .zip(gold.iter())
            .filter(|(p, g)| p == g)
            .count();
        Ok(())
    }

    /// Current accuracy in [0, 1]; 0.0 before any update. Clears the running
    /// counts when `reset` is set.
    pub fn get_metric(&self, reset: bool) -> f32 {
        let mut counts = self.counts.lock();
        let value = if counts.total == 0 {
            0.0
        } else {
            counts.correct as f32 / counts.total as f32
        };
        if reset {
            *counts = Counts::default();
        }
        value
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn accuracy_counts_argmax_matches() {
        let device = Device::Cpu;
        let accuracy = CategoricalAccuracy::new();
        let logits =
            Tensor::new(&[[9f32, 0., 0., 0.], [0., 0., 9., 0.]], &device).unwrap();

        let labels = Tensor::new(&[0u32, 2], &device).unwrap();
        accuracy.update(&logits, &labels).unwrap();
        assert_eq!(accuracy.get_metric(false), 1.0);

        let labels = Tensor::new(&[1u32, 2], &device).unwrap();
        accuracy.update(&logits, &labels).unwrap();
        assert_eq!(accuracy.get_metric(false), 0.75);
    }

    #[test]
    fn reset_clears_counts() {
        let device = Device::Cpu;
        let accuracy = CategoricalAccuracy::new();
        let logits = Tensor::new(&[[1f32, 0., 0., 0.]], &device).unwrap();
        let labels = Tensor::new(&[0u32], &device).unwrap();
        accuracy.update(&logits, &labels).unwrap();

        assert_eq!(accuracy.get_metric(true), 1.0);
        assert_eq!(accuracy.get_metric(false), 0.0);
    }

    #[test]
    fn no_updates_reports_zero() {
        let accuracy = CategoricalAccuracy::new();
        assert_eq!(accuracy.get_metric(false), 0.0);
    }
}
