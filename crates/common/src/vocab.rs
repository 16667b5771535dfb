//! Word-level tokeniser building.
//!
//! SWAG CSVs ship without a tokeniser, so we assemble a HuggingFace-format
//! `tokenizer.json` (WordLevel model, whitespace pre-tokenisation, lowercase
//! normalisation) straight from the dataset's text columns, write it to disk,
//! and load it back through `tokenizers`. Building the JSON directly avoids
//! the trainer plumbing of the `tokenizers` crate entirely.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::data::SwagExample;

/// Padding token, always id 0 (the batcher pads with 0).
pub const PAD_TOKEN: &str = "[PAD]";
/// Unknown-word token, always id 1.
pub const UNK_TOKEN: &str = "[UNK]";

fn collect_words(text: &str, freq: &mut HashMap<String, usize>) {
    for word in text.split_whitespace() {
        let w = word.to_lowercase();
        let w = w.trim_matches(|c: char| !c.is_alphanumeric());
        if !w.is_empty() {
            *freq.entry(w.to_string()).or_insert(0) += 1;
        }
    }
}

/// Build a word-level tokeniser over the text fields of `examples`, write it
/// to `path`, and load it back as a ready-to-use [`Tokenizer`].
///
/// The vocabulary keeps the `vocab_size - 2` most frequent words (two slots
/// are reserved for `[PAD]` and `[UNK]`), ties broken alphabetically so the
/// result is deterministic.
pub fn build_word_level_tokenizer(
    examples: &[SwagExample],
    vocab_size: usize,
    path: &Path,
) -> Result<Tokenizer> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for example in examples {
        collect_words(&example.startphrase, &mut freq);
        for ending in &example.endings {
            collect_words(ending, &mut freq);
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(2));

    let mut vocab = serde_json::Map::new();
    vocab.insert(PAD_TOKEN.to_string(), 0u32.into());
    vocab.insert(UNK_TOKEN.to_string(), 1u32.into());
    let mut next_id = 2u32;
    for (word, _) in &words {
        if !vocab.contains_key(word) {
            vocab.insert(word.clone(), next_id.into());
            next_id += 1;
        }
    }

    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": PAD_TOKEN, "single_word": false, "lstrip": false,
             "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": UNK_TOKEN, "single_word": false, "lstrip": false,
             "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    });

    std::fs::write(path, serde_json::to_string_pretty(&tokenizer_json)?)
        .with_context(|| format!("write tokenizer to {}", path.display()))?;
    tracing::info!(words = next_id, path = %path.display(), "word-level tokenizer built");

    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("reload tokenizer from {}: {e}", path.display()))
}

// ── Tests ───────────────────────────────────────────────────────────────────
