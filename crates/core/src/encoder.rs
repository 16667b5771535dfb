//! Sequence-to-vector encoders.
//!
//! An encoder turns `(batch, seq, dim)` token vectors plus a `(batch, seq)`
//! mask into one fixed-size vector per sequence. The variant is chosen by
//! [`EncoderConfig`] and resolved once at construction.

use candle_core::{bail, Result, Tensor, D};
use candle_nn::{Conv1d, Conv1dConfig, Init, Module, VarBuilder};

use swag_common::EncoderConfig;

/// Resolved encoder choice.
pub enum Seq2VecEncoder {
    Boe(BagOfEmbeddings),
    Cnn(CnnEncoder),
}

impl Seq2VecEncoder {
    /// Construct from config. `vb` should be scoped to the encoder prefix
    /// (e.g. `vb.pp("ending_encoder")`).
    pub fn new(config: &EncoderConfig, init: Init, vb: VarBuilder) -> Result<Self> {
        match config {
            EncoderConfig::Boe {
                embedding_dim,
                averaged,
            } => Ok(Self::Boe(BagOfEmbeddings {
                dim: *embedding_dim,
                averaged: *averaged,
            })),
            EncoderConfig::Cnn {
                embedding_dim,
                num_filters,
                ngram_filter_sizes,
            } => Ok(Self::Cnn(CnnEncoder::new(
                *embedding_dim,
                *num_filters,
                ngram_filter_sizes,
                init,
                vb,
            )?)),
        }
    }

    pub fn input_dim(&self) -> usize {
        match self {
            Self::Boe(boe) => boe.dim,
            Self::Cnn(cnn) => cnn.input_dim,
        }
    }

    pub fn output_dim(&self) -> usize {
        match self {
            Self::Boe(boe) => boe.dim,
            Self::Cnn(cnn) => cnn.output_dim,
        }
    }

    pub fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<Tensor> {
        match self {
            Self::Boe(boe) => boe.forward(xs, mask),
            Self::Cnn(cnn) => cnn.forward(xs, mask),
        }
    }

    /// Learnable parameters, for regularisation reporting.
    pub fn parameters(&self) -> Vec<&Tensor> {
        match self {
            Self::Boe(_) => Vec::new(),
            Self::Cnn(cnn) => cnn.parameters(),
        }
    }
}

// ── BagOfEmbeddings ─────────────────────────────────────────────────────────

/// Masked sum of token vectors, optionally averaged over the real tokens.
/// Parameter-free.
pub struct BagOfEmbeddings {
    dim: usize,
    averaged: bool,
}

impl BagOfEmbeddings {
    fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let masked = xs.broadcast_mul(&mask.unsqueeze(2)?)?;
        let summed = masked.sum(1)?;
        if !self.averaged {
            return Ok(summed);
        }
        // A fully-masked row divides by epsilon instead of zero.
        let counts = mask.sum_keepdim(1)?.affine(1.0, 1e-9)?;
        summed.broadcast_div(&counts)
    }
}

// ── CnnEncoder ──────────────────────────────────────────────────────────────

/// 1-d convolutions over time, one per ngram filter size, each max-pooled
/// and concatenated. Output dim is `num_filters * ngram_filter_sizes.len()`.
pub struct CnnEncoder {
    convs: Vec<Conv1d>,
    input_dim: usize,
    output_dim: usize,
    max_filter_size: usize,
}

impl CnnEncoder {
    fn new(
        embedding_dim: usize,
        num_filters: usize,
        ngram_filter_sizes: &[usize],
        init: Init,
        vb: VarBuilder,
    ) -> Result<Self> {
        if ngram_filter_sizes.is_empty() {
            bail!("cnn encoder needs at least one ngram filter size");
        }
        if num_filters == 0 {
            bail!("cnn encoder needs at least one filter");
        }

        let mut convs = Vec::with_capacity(ngram_filter_sizes.len());
        let mut max_filter_size = 0;
        for (i, &size) in ngram_filter_sizes.iter().enumerate() {
            if size == 0 {
                bail!("ngram filter sizes must be positive");
            }
            max_filter_size = max_filter_size.max(size);
            let vb_conv = vb.pp(format!("conv{i}"));
            let weight =
                vb_conv.get_with_hints((num_filters, embedding_dim, size), "weight", init)?;
            let bias = vb_conv.get_with_hints(num_filters, "bias", Init::Const(0.0))?;
            convs.push(Conv1d::new(weight, Some(bias), Conv1dConfig::default()));
        }

        Ok(Self {
            convs,
            input_dim: embedding_dim,
            output_dim: num_filters * ngram_filter_sizes.len(),
            max_filter_size,
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<Tensor> {
        // Zero the padding positions, then go channels-first for conv1d.
        let masked = xs.broadcast_mul(&mask.unsqueeze(2)?)?;
        let mut x = masked.transpose(1, 2)?.contiguous()?;

        // Sequences shorter than the widest filter get zero-padded on the right.
        let seq_len = x.dim(2)?;
        if seq_len < self.max_filter_size {
            x = x.pad_with_zeros(2, 0, self.max_filter_size - seq_len)?;
        }

        let mut pooled = Vec::with_capacity(self.convs.len());
        for conv in &self.convs {
            let features = conv.forward(&x)?.relu()?;
            pooled.push(features.max(D::Minus1)?);
        }
        Tensor::cat(&pooled, D::Minus1)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut out = Vec::with_capacity(self.convs.len() * 2);
        for conv in &self.convs {
            out.push(conv.weight());
            if let Some(bias) = conv.bias() {
                out.push(bias);
            }
        }
        out
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
