//! Model configuration for the SWAG ranker.
//!
//! Serialised as JSON so a config file can sit next to a checkpoint. Every
//! optional field has a default, so a minimal config only has to name the
//! embedder dimensions and the two encoders.

use serde::{Deserialize, Serialize};

/// Configuration for the SWAG scoring model.
///
/// Stored alongside weights for reproducible reloads. Construction-time
/// validation (embedder/encoder dimension agreement) happens in `swag-core`
/// when the model is built, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwagModelConfig {
    /// Shared text-field embedder applied to the startphrase and all endings.
    pub embedder: EmbedderConfig,
    /// Encoder for the startphrase.
    pub startphrase_encoder: EncoderConfig,
    /// Encoder applied to each ending (weights shared across the four).
    pub ending_encoder: EncoderConfig,
    /// Similarity between the startphrase vector and each ending vector.
    #[serde(default)]
    pub similarity: SimilarityConfig,
    /// Weight initialiser applied to every learnable parameter.
    #[serde(default)]
    pub initializer: InitializerConfig,
    /// Optional parameter regulariser, reported but never folded into the
    /// forward-pass loss.
    #[serde(default)]
    pub regularizer: Option<RegularizerConfig>,
}

/// Token-embedding table dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Vocabulary size (must match the tokeniser).
    pub vocab_size: usize,
    /// Per-token embedding dimension.
    pub embedding_dim: usize,
}

/// Sequence-to-vector encoder choice.
///
/// Replaces registry-based encoder lookup with an explicit variant resolved
/// once at model construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncoderConfig {
    /// Bag of embeddings: masked sum over time, optionally averaged.
    Boe {
        embedding_dim: usize,
        #[serde(default = "default_true")]
        averaged: bool,
    },
    /// 1-d convolutions over time with max pooling per filter size.
    Cnn {
        embedding_dim: usize,
        num_filters: usize,
        ngram_filter_sizes: Vec<usize>,
    },
}

impl EncoderConfig {
    /// Dimension of the token vectors this encoder consumes.
    pub fn input_dim(&self) -> usize {
        match self {
            EncoderConfig::Boe { embedding_dim, .. } => *embedding_dim,
            EncoderConfig::Cnn { embedding_dim, .. } => *embedding_dim,
        }
    }

    /// Dimension of the single vector this encoder produces.
    pub fn output_dim(&self) -> usize {
        match self {
            EncoderConfig::Boe { embedding_dim, .. } => *embedding_dim,
            EncoderConfig::Cnn {
                num_filters,
                ngram_filter_sizes,
                ..
            } => num_filters * ngram_filter_sizes.len(),
        }
    }
}

/// Similarity function between encoded vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityConfig {
    #[default]
    DotProduct,
    Cosine,
}

/// Weight initialiser choice, mapped onto `candle_nn::Init` in `swag-core`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitializerConfig {
    Normal { mean: f64, std: f64 },
    Uniform { low: f64, high: f64 },
    KaimingNormal,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        InitializerConfig::KaimingNormal
    }
}

/// L2 penalty over model parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegularizerConfig {
    pub l2: f64,
}

fn default_true() -> bool {
    true
}

impl SwagModelConfig {
    /// A small working config sized to a given vocabulary.
    ///
    /// Used by the CLI when no config file exists yet.
    pub fn default_for_vocab(vocab_size: usize) -> Self {
        Self {
            embedder: EmbedderConfig {
                vocab_size,
                embedding_dim: 64,
            },
            startphrase_encoder: EncoderConfig::Boe {
                embedding_dim: 64,
                averaged: true,
            },
            ending_encoder: EncoderConfig::Boe {
                embedding_dim: 64,
                averaged: true,
            },
            similarity: SimilarityConfig::default(),
            initializer: InitializerConfig::default(),
            regularizer: None,
        }
    }

    /// Save config to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_json_round_trip() {
        let config = SwagModelConfig::default_for_vocab(1000);
        let json = serde_json::to_string(&config).unwrap();
        let loaded: SwagModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.embedder.vocab_size, 1000);
        assert_eq!(loaded.embedder.embedding_dim, 64);
        assert_eq!(loaded.similarity, SimilarityConfig::DotProduct);
        assert!(loaded.regularizer.is_none());
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let json = r#"{
            "embedder": { "vocab_size": 200, "embedding_dim": 16 },
            "startphrase_encoder": { "type": "boe", "embedding_dim": 16 },
            "ending_encoder": { "type": "cnn", "embedding_dim": 16,
                                "num_filters": 8, "ngram_filter_sizes": [2, 3] }
        }"#;
        let loaded: SwagModelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(loaded.similarity, SimilarityConfig::DotProduct);
        assert_eq!(loaded.initializer, InitializerConfig::KaimingNormal);
        match loaded.startphrase_encoder {
            EncoderConfig::Boe { averaged, .. } => assert!(averaged),
            _ => panic!("expected boe"),
        }
    }

    #[test]
    fn encoder_dims() {
        let boe = EncoderConfig::Boe {
            embedding_dim: 32,
            averaged: false,
        };
        assert_eq!(boe.input_dim(), 32);
        assert_eq!(boe.output_dim(), 32);

        let cnn = EncoderConfig::Cnn {
            embedding_dim: 32,
            num_filters: 10,
            ngram_filter_sizes: vec![2, 3, 4],
        };
        assert_eq!(cnn.input_dim(), 32);
        assert_eq!(cnn.output_dim(), 30);
    }
}
