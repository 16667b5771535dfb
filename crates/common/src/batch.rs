//! Batching: example records → padded token-id and mask tensors.
//!
//! Each text field of a batch is tokenised with `encode_batch`, padded with
//! id 0 to the longest sequence in the batch (truncated to the configured
//! maximum), and paired with an f32 mask that is 1.0 on real tokens and 0.0
//! on padding. Labels become a `(batch,)` u32 tensor when every example in
//! the batch carries one.

use std::path::Path;

use anyhow::{bail, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use crate::data::{SwagExample, NUM_ENDINGS};

/// One tokenised text field of a batch.
pub struct TokenField {
    /// `(batch, seq)` u32 token ids, 0-padded.
    pub ids: Tensor,
    /// `(batch, seq)` f32 mask: 1.0 on tokens, 0.0 on padding.
    pub mask: Tensor,
}

/// One batch of tokenised SWAG examples, ready for the model.
pub struct SwagBatch {
    pub startphrase: TokenField,
    pub endings: [TokenField; NUM_ENDINGS],
    /// `(batch,)` u32 gold ending indices; `None` for inference batches.
    pub labels: Option<Tensor>,
}

/// Turns [`SwagExample`]s into [`SwagBatch`]es.
pub struct SwagBatcher {
    tokenizer: Tokenizer,
    max_len: Option<usize>,
    device: Device,
}

impl SwagBatcher {
    pub fn new(tokenizer: Tokenizer, max_len: Option<usize>, device: Device) -> Self {
        Self {
            tokenizer,
            max_len,
            device,
        }
    }

    /// Load the tokeniser from a `tokenizer.json` file.
    pub fn from_file(path: &Path, max_len: Option<usize>, device: Device) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("load tokenizer from {}: {e}", path.display()))?;
        Ok(Self::new(tokenizer, max_len, device))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Vocabulary size of the underlying tokeniser, added tokens included.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Tokenise one batch of examples.
    ///
    /// Fails on an empty slice and on a batch that mixes labelled and
    /// unlabelled examples, since a partial label tensor has no meaning.
    pub fn batch(&self, examples: &[SwagExample]) -> Result<SwagBatch> {
        if examples.is_empty() {
            bail!("cannot batch zero examples");
        }

        let startphrase =
            self.encode_field(examples.iter().map(|e| e.startphrase.as_str()).collect())?;
        let ending = |k: usize| {
            self.encode_field(examples.iter().map(|e| e.endings[k].as_str()).collect())
        };
        let endings = [ending(0)?, ending(1)?, ending(2)?, ending(3)?];

        let labelled = examples.iter().filter(|e| e.label.is_some()).count();
        let labels = if labelled == examples.len() {
            let ids: Vec<u32> = examples.iter().filter_map(|e| e.label).collect();
            Some(Tensor::from_vec(ids, (examples.len(),), &self.device)?)
        } else if labelled == 0 {
            None
        } else {
            bail!(
                "batch mixes labelled and unlabelled examples ({labelled} of {})",
                examples.len()
            );
        };

        Ok(SwagBatch {
            startphrase,
            endings,
            labels,
        })
    }

    fn encode_field(&self, texts: Vec<&str>) -> Result<TokenField> {
        let encodings = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(|e| anyhow::anyhow!("tokenize batch: {e}"))?;

        let batch = encodings.len();
        let longest = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let seq_len = match self.max_len {
            Some(max) => longest.min(max),
            None => longest,
        };
        // An all-empty field still needs one (masked) position.
        let seq_len = seq_len.max(1);

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            let token_ids = encoding.get_ids();
            let attention = encoding.get_attention_mask();
            for i in 0..seq_len {
                if i < token_ids.len() {
                    ids.push(token_ids[i]);
                    mask.push(attention[i] as f32);
                } else {
                    ids.push(0);
                    mask.push(0.0);
                }
            }
        }

        Ok(TokenField {
            ids: Tensor::from_vec(ids, (batch, seq_len), &self.device)?,
            mask: Tensor::from_vec(mask, (batch, seq_len), &self.device)?,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::build_word_level_tokenizer;
    use std::collections::HashMap;

    fn example(startphrase: &str, label: Option<u32>) -> SwagExample {
        SwagExample {
            startphrase: startphrase.to_string(),
            endings: [
                "He stands up.".to_string(),
                "He flies away.".to_string(),
                "He eats soup.".to_string(),
                "He sleeps.".to_string(),
            ],
            label,
            metadata: HashMap::new(),
        }
    }

    fn batcher(max_len: Option<usize>) -> SwagBatcher {
        let dir = tempfile::tempdir().unwrap();
        let examples = [example("A man is sitting on a bench.", None)];
        let tokenizer =
            build_word_level_tokenizer(&examples, 100, &dir.path().join("tokenizer.json"))
                .unwrap();
        SwagBatcher::new(tokenizer, max_len, Device::Cpu)
    }

    #[test]
    fn batch_shapes_and_masks() {
        let batcher = batcher(None);
        let examples = [
            example("A man is sitting.", Some(0)),
            example("A man is sitting on a bench.", Some(2)),
        ];

        let batch = batcher.batch(&examples).unwrap();
        let (b, t) = batch.startphrase.ids.dims2().unwrap();
        assert_eq!(b, 2);
        assert_eq!(batch.startphrase.mask.dims2().unwrap(), (b, t));
        for field in &batch.endings {
            assert_eq!(field.ids.dims2().unwrap().0, 2);
        }

        // Row 0 is shorter than row 1, so its mask tail is all zeros.
        let mask: Vec<Vec<f32>> = batch.startphrase.mask.to_vec2().unwrap();
        let row0_tokens = mask[0].iter().filter(|&&m| m == 1.0).count();
        let row1_tokens = mask[1].iter().filter(|&&m| m == 1.0).count();
        assert!(row0_tokens < row1_tokens);
        assert_eq!(row1_tokens, t);
        assert!(mask[0][row0_tokens..].iter().all(|&m| m == 0.0));

        let labels: Vec<u32> = batch.labels.unwrap().to_vec1().unwrap();
        assert_eq!(labels, vec![0, 2]);
    }

    #[test]
    fn unlabelled_batch_has_no_label_tensor() {
        let batcher = batcher(None);
        let examples = [example("A man is sitting.", None)];
        let batch = batcher.batch(&examples).unwrap();
        assert!(batch.labels.is_none());
    }

    #[test]
    fn mixed_labels_error() {
        let batcher = batcher(None);
        let examples = [
            example("A man is sitting.", Some(1)),
            example("A man is sitting.", None),
        ];
        assert!(batcher.batch(&examples).is_err());
    }

    #[test]
    fn empty_batch_errors() {
        let batcher = batcher(None);
        assert!(batcher.batch(&[]).is_err());
    }

    #[test]
    fn max_len_truncates() {
        let batcher = batcher(Some(3));
        let examples = [example("A man is sitting on a bench.", None)];
        let batch = batcher.batch(&examples).unwrap();
        assert_eq!(batch.startphrase.ids.dims2().unwrap().1, 3);
    }
}
