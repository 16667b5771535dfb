//! The SWAG scoring model.
//!
//! Predicts the most plausible ending by encoding the startphrase and the
//! four endings, scoring each ending against the startphrase with the
//! configured similarity function, and softmaxing the four scores. With gold
//! labels present it also produces a cross-entropy loss and feeds a running
//! accuracy metric.

use candle_core::{bail, Result, Tensor, D};
use candle_nn::{loss, ops, Init, VarBuilder};

use swag_common::{
    InitializerConfig, RegularizerConfig, SwagBatch, SwagModelConfig, TokenField, NUM_ENDINGS,
};

use crate::embedder::TextFieldEmbedder;
use crate::encoder::Seq2VecEncoder;
use crate::metrics::CategoricalAccuracy;
use crate::similarity::Similarity;

/// Model outputs for one batch.
pub struct SwagOutput {
    /// `(batch, 4)` raw similarity scores.
    pub logits: Tensor,
    /// `(batch, 4)` softmax distribution over the endings.
    pub probabilities: Tensor,
    /// Mean cross-entropy over the batch; present iff labels were supplied.
    pub loss: Option<Tensor>,
}

/// Metrics reported by [`SwagModel::get_metrics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwagMetrics {
    pub accuracy: f32,
}

fn check_dimensions_match(a: usize, b: usize, a_name: &str, b_name: &str) -> Result<()> {
    if a != b {
        bail!("{a_name} ({a}) must match {b_name} ({b})");
    }
    Ok(())
}

fn resolve_init(config: InitializerConfig) -> Init {
    match config {
        InitializerConfig::Normal { mean, std } => Init::Randn { mean, stdev: std },
        InitializerConfig::Uniform { low, high } => Init::Uniform { lo: low, up: high },
        InitializerConfig::KaimingNormal => candle_nn::init::DEFAULT_KAIMING_NORMAL,
    }
}

/// Dot-product ranker over the four candidate endings.
///
/// Stateless across calls apart from the running accuracy accumulator, which
/// only changes when a labelled batch passes through `forward` and only
/// resets when `get_metrics(true)` asks for it.
pub struct SwagModel {
    embedder: TextFieldEmbedder,
    startphrase_encoder: Seq2VecEncoder,
    ending_encoder: Seq2VecEncoder,
    similarity: Similarity,
    regularizer: Option<RegularizerConfig>,
    accuracy: CategoricalAccuracy,
}

impl SwagModel {
    /// Build the model from config. Fails fast when the embedder and encoder
    /// dimensions disagree; that is a configuration error, not something to
    /// recover from at runtime.
    pub fn new(config: &SwagModelConfig, vb: VarBuilder) -> Result<Self> {
        check_dimensions_match(
            config.embedder.embedding_dim,
            config.startphrase_encoder.input_dim(),
            "text field embedding dim",
            "startphrase encoder input dim",
        )?;
        check_dimensions_match(
            config.embedder.embedding_dim,
            config.ending_encoder.input_dim(),
            "text field embedding dim",
            "ending encoder input dim",
        )?;
        check_dimensions_match(
            config.startphrase_encoder.output_dim(),
            config.ending_encoder.output_dim(),
            "startphrase encoder output dim",
            "ending encoder output dim",
        )?;

        let init = resolve_init(config.initializer);
        let embedder = TextFieldEmbedder::new(&config.embedder, init, vb.pp("embedder"))?;
        let startphrase_encoder = Seq2VecEncoder::new(
            &config.startphrase_encoder,
            init,
            vb.pp("startphrase_encoder"),
        )?;
        let ending_encoder =
            Seq2VecEncoder::new(&config.ending_encoder, init, vb.pp("ending_encoder"))?;

        Ok(Self {
            embedder,
            startphrase_encoder,
            ending_encoder,
            similarity: config.similarity.into(),
            regularizer: config.regularizer,
            accuracy: CategoricalAccuracy::new(),
        })
    }

    fn encode(&self, field: &TokenField, encoder: &Seq2VecEncoder) -> Result<Tensor> {
        let embedded = self.embedder.forward(&field.ids)?;
        encoder.forward(&embedded, &field.mask)
    }

    /// Forward pass over one batch.
    pub fn forward(&self, batch: &SwagBatch) -> Result<SwagOutput> {
        let startphrase = self.encode(&batch.startphrase, &self.startphrase_encoder)?;

        let mut endings = Vec::with_capacity(NUM_ENDINGS);
        for field in &batch.endings {
            endings.push(self.encode(field, &self.ending_encoder)?);
        }
        let endings = Tensor::stack(&endings, 1)?;

        let logits = self.similarity.scores(&startphrase, &endings)?;
        let probabilities = ops::softmax(&logits, D::Minus1)?;

        let loss = match &batch.labels {
            Some(labels) => {
                self.accuracy.update(&logits, labels)?;
                Some(loss::cross_entropy(&logits, labels)?)
            }
            None => None,
        };

        Ok(SwagOutput {
            logits,
            probabilities,
            loss,
        })
    }

    pub fn get_metrics(&self, reset: bool) -> SwagMetrics {
        SwagMetrics {
            accuracy: self.accuracy.get_metric(reset),
        }
    }

    /// L2 penalty over all learnable parameters, when a regulariser is
    /// configured. Reported for an external optimisation loop; never folded
    /// into the forward-pass loss.
    pub fn regularization_penalty(&self) -> Result<Option<Tensor>> {
        let Some(regularizer) = self.regularizer else {
            return Ok(None);
        };

        let mut parameters = vec![self.embedder.embeddings()];
        parameters.extend(self.startphrase_encoder.parameters());
        parameters.extend(self.ending_encoder.parameters());

        let mut penalty: Option<Tensor> = None;
        for parameter in parameters {
            let sum_sq = parameter.sqr()?.sum_all()?;
            penalty = Some(match penalty {
                Some(acc) => (acc + sum_sq)?,
                None => sum_sq,
            });
        }
        match penalty {
            Some(total) => Ok(Some(total.affine(regularizer.l2, 0.0)?)),
            None => Ok(None),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
