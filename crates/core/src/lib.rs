//! # swag-core — The Scoring Model
//!
//! Everything needed to score four candidate endings against a startphrase:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`embedder`] | `TextFieldEmbedder`, the shared token-embedding table |
//! | [`encoder`] | `Seq2VecEncoder` (`boe` masked pooling, `cnn` max-pooled convolutions) |
//! | [`similarity`] | `Similarity` (dot product / cosine) |
//! | [`metrics`] | `CategoricalAccuracy` running metric |
//! | [`model`] | `SwagModel`, `SwagOutput`, `SwagMetrics` |
//!
//! ## Design principles
//!
//! 1. **Pure candle hot path.** All tensor work goes through
//!    `candle-core`/`candle-nn`; no hand-rolled numerics.
//! 2. **`Send + Sync`-safe.** The accuracy accumulator uses
//!    `parking_lot::Mutex`, not `RefCell`.
//! 3. **Fail fast.** Dimension mismatches are construction errors, never
//!    runtime surprises.

pub mod embedder;
pub mod encoder;
pub mod metrics;
pub mod model;
pub mod similarity;

// ── Public re-exports ───────────────────────────────────────────────────────

pub use embedder::TextFieldEmbedder;
pub use encoder::Seq2VecEncoder;
pub use metrics::CategoricalAccuracy;
pub use model::{SwagMetrics, SwagModel, SwagOutput};
pub use similarity::Similarity;
