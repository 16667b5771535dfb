//! # swag-common — Shared Primitives
//!
//! Types and utilities shared across every crate in the workspace:
//!
//! * **[`SwagModelConfig`]** — model hyper-parameters (serialised as JSON).
//! * **[`SwagReader`]** / **[`SwagExamples`]** — CSV dataset reading, eager or lazy.
//! * **[`SwagBatcher`]** / **[`SwagBatch`]** — examples → padded token tensors.
//! * **[`build_word_level_tokenizer`]** — `tokenizer.json` glue for raw CSVs.

pub mod batch;
pub mod config;
pub mod data;
pub mod vocab;

pub use batch::{SwagBatch, SwagBatcher, TokenField};
pub use config::{
    EmbedderConfig, EncoderConfig, InitializerConfig, RegularizerConfig, SimilarityConfig,
    SwagModelConfig,
};
pub use data::{SwagExample, SwagExamples, SwagReader, NUM_ENDINGS};
pub use vocab::{build_word_level_tokenizer, PAD_TOKEN, UNK_TOKEN};
