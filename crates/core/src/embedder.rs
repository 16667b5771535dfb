//! Shared text-field embedder.

use candle_core::{Result, Tensor};
use candle_nn::{Embedding, Init, Module, VarBuilder};

use swag_common::EmbedderConfig;

/// Token-id → vector lookup, shared between the startphrase and all four
/// endings so every text field lives in the same embedding space.
pub struct TextFieldEmbedder {
    embedding: Embedding,
    output_dim: usize,
}

impl TextFieldEmbedder {
    /// Construct from config. `vb` should be scoped to the embedder prefix
    /// (e.g. `vb.pp("embedder")`).
    pub fn new(config: &EmbedderConfig, init: Init, vb: VarBuilder) -> Result<Self> {
        let weight =
            vb.get_with_hints((config.vocab_size, config.embedding_dim), "weight", init)?;
        Ok(Self {
            embedding: Embedding::new(weight, config.embedding_dim),
            output_dim: config.embedding_dim,
        })
    }

    /// `(batch, seq)` token ids → `(batch, seq, dim)` token vectors.
    pub fn forward(&self, ids: &Tensor) -> Result<Tensor> {
        self.embedding.forward(ids)
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// The learnable embedding table.
    pub fn embeddings(&self) -> &Tensor {
        self.embedding.embeddings()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn embeds_to_expected_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = EmbedderConfig {
            vocab_size: 10,
            embedding_dim: 4,
        };
        let embedder =
            TextFieldEmbedder::new(&config, candle_nn::init::DEFAULT_KAIMING_NORMAL, vb).unwrap();
        assert_eq!(embedder.output_dim(), 4);

        let ids = Tensor::new(&[[1u32, 2, 3], [4, 5, 0]], &device).unwrap();
        let out = embedder.forward(&ids).unwrap();
        assert_eq!(out.dims3().unwrap(), (2, 3, 4));
    }
}
