//! Similarity scoring between the startphrase vector and the ending vectors.

use candle_core::{Result, Tensor, D};

use swag_common::SimilarityConfig;

/// Resolved similarity function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    DotProduct,
    Cosine,
}

impl From<SimilarityConfig> for Similarity {
    fn from(config: SimilarityConfig) -> Self {
        match config {
            SimilarityConfig::DotProduct => Similarity::DotProduct,
            SimilarityConfig::Cosine => Similarity::Cosine,
        }
    }
}

impl Similarity {
    /// Score each ending vector against the startphrase vector.
    ///
    /// `startphrase` is `(batch, dim)`, `endings` is `(batch, choices, dim)`;
    /// the result is `(batch, choices)`. Only the trailing size-1 matmul
    /// dimension is squeezed, so a batch of one keeps its batch dimension.
    pub fn scores(&self, startphrase: &Tensor, endings: &Tensor) -> Result<Tensor> {
        let (start, ends) = match self {
            Similarity::DotProduct => (startphrase.clone(), endings.clone()),
            Similarity::Cosine => (l2_normalize(startphrase)?, l2_normalize(endings)?),
        };
        ends.matmul(&start.unsqueeze(2)?)?.squeeze(2)
    }
}

fn l2_normalize(xs: &Tensor) -> Result<Tensor> {
    let norm = xs.sqr()?.sum_keepdim(D::Minus1)?.sqrt()?.affine(1.0, 1e-12)?;
    xs.broadcast_div(&norm)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn dot_product_scores() {
        let device = Device::Cpu;
        let start = Tensor::new(&[[1f32, 2.]], &device).unwrap();
        let endings = Tensor::new(&[[[1f32, 0.], [0., 1.], [1., 1.], [2., 2.]]], &device).unwrap();

        let scores = Similarity::DotProduct.scores(&start, &endings).unwrap();
        assert_eq!(scores.dims2().unwrap(), (1, 4));
        let values: Vec<Vec<f32>> = scores.to_vec2().unwrap();
        assert_eq!(values[0], vec![1.0, 2.0, 3.0, 6.0]);
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let device = Device::Cpu;
        let start = Tensor::new(&[[3f32, 4.]], &device).unwrap();
        let endings = Tensor::new(&[[[6f32, 8.], [-3., -4.], [4., -3.], [3., 4.]]], &device)
            .unwrap();

        let values: Vec<Vec<f32>> = Similarity::Cosine
            .scores(&start, &endings)
            .unwrap()
            .to_vec2()
            .unwrap();
        assert!((values[0][0] - 1.0).abs() < 1e-5);
        assert!((values[0][1] + 1.0).abs() < 1e-5);
        assert!(values[0][2].abs() < 1e-5);
        assert!((values[0][3] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn batch_dimension_survives_batch_of_one() {
        let device = Device::Cpu;
        let start = Tensor::randn(0f32, 1f32, (1, 8), &device).unwrap();
        let endings = Tensor::randn(0f32, 1f32, (1, 4, 8), &device).unwrap();
        let scores = Similarity::DotProduct.scores(&start, &endings).unwrap();
        assert_eq!(scores.dims2().unwrap(), (1, 4));
    }
}
