//! SWAG dataset reading: CSV rows → example records.
//!
//! The expected file is a CSV with a header row naming `startphrase`,
//! `ending0`..`ending3`, and optionally `label`. Any other columns are kept
//! as per-example metadata (real SWAG files carry `video-id`, `fold-ind`,
//! and friends).
//!
//! * **Eager mode** — parse every row up front; errors surface immediately.
//! * **Lazy mode** — validate the header, then re-open the file on every
//!   [`SwagExamples::iter`] call and parse rows on demand. Restartable, so
//!   multiple passes cost a re-scan instead of peak memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// SWAG is a four-way multiple-choice task.
pub const NUM_ENDINGS: usize = 4;

/// One row of a SWAG dataset: a context sentence, four candidate endings,
/// and optionally the index of the correct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwagExample {
    pub startphrase: String,
    pub endings: [String; NUM_ENDINGS],
    /// Gold ending index. `None` for inference-only rows.
    pub label: Option<u32>,
    /// Every CSV column that is not a text field or the label.
    pub metadata: HashMap<String, String>,
}

/// Header-resolved column positions, computed once per file.
#[derive(Debug, Clone)]
struct Columns {
    startphrase: usize,
    endings: [usize; NUM_ENDINGS],
    label: Option<usize>,
    extra: Vec<(String, usize)>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| {
            find(name).with_context(|| format!("missing required column '{name}'"))
        };

        let startphrase = required("startphrase")?;
        let endings = [
            required("ending0")?,
            required("ending1")?,
            required("ending2")?,
            required("ending3")?,
        ];
        let label = find("label");

        let mut used = vec![startphrase];
        used.extend(endings);
        used.extend(label);
        let extra = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used.contains(idx))
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        Ok(Self {
            startphrase,
            endings,
            label,
            extra,
        })
    }

    fn parse_row(&self, record: &csv::StringRecord) -> Result<SwagExample> {
        let field = |idx: usize| {
            record
                .get(idx)
                .map(str::to_string)
                .with_context(|| format!("row is missing field {idx}"))
        };

        let startphrase = field(self.startphrase)?;
        let endings = [
            field(self.endings[0])?,
            field(self.endings[1])?,
            field(self.endings[2])?,
            field(self.endings[3])?,
        ];

        // An absent column and an empty cell both mean "no gold label".
        let label = match self.label.and_then(|idx| record.get(idx)) {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(
                raw.trim()
                    .parse::<u32>()
                    .with_context(|| format!("invalid label '{raw}'"))?,
            ),
        };

        let metadata = self
            .extra
            .iter()
            .filter_map(|(name, idx)| record.get(*idx).map(|v| (name.clone(), v.to_string())))
            .collect();

        Ok(SwagExample {
            startphrase,
            endings,
            label,
            metadata,
        })
    }
}

fn open(path: &Path) -> Result<(csv::Reader<std::fs::File>, Columns)> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let columns = Columns::from_headers(
        reader
            .headers()
            .with_context(|| format!("read CSV header of {}", path.display()))?,
    )?;
    Ok((reader, columns))
}

// ── SwagReader ──────────────────────────────────────────────────────────────

/// Reads a SWAG CSV into [`SwagExamples`].
#[derive(Debug, Clone, Default)]
pub struct SwagReader {
    lazy: bool,
}

impl SwagReader {
    pub fn new(lazy: bool) -> Self {
        Self { lazy }
    }

    /// Read a dataset file. The header is validated in both modes; eager mode
    /// additionally parses every row before returning.
    pub fn read(&self, path: &Path) -> Result<SwagExamples> {
        tracing::info!(path = %path.display(), lazy = self.lazy, "reading SWAG dataset");
        let (reader, columns) = open(path)?;

        if self.lazy {
            return Ok(SwagExamples {
                inner: Inner::Lazy {
                    path: path.to_path_buf(),
                    columns,
                },
            });
        }

        let mut examples = Vec::new();
        for record in reader.into_records() {
            let record =
                record.with_context(|| format!("malformed row in {}", path.display()))?;
            examples.push(columns.parse_row(&record)?);
        }
        tracing::info!(count = examples.len(), "dataset loaded");
        Ok(SwagExamples {
            inner: Inner::Eager(examples),
        })
    }
}

// ── SwagExamples ────────────────────────────────────────────────────────────

/// The examples of one dataset file, either materialised or re-read on
/// demand.
#[derive(Debug)]
pub struct SwagExamples {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Eager(Vec<SwagExample>),
    Lazy { path: PathBuf, columns: Columns },
}

impl SwagExamples {
    /// Iterate over the examples in file order.
    ///
    /// For a lazy dataset this re-opens the file, so each call is a fresh,
    /// restartable pass and every row yields a `Result`; eager datasets
    /// yield the already-parsed rows.
    pub fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<SwagExample>> + '_>> {
        match &self.inner {
            Inner::Eager(examples) => Ok(Box::new(examples.iter().cloned().map(Ok))),
            Inner::Lazy { path, columns } => {
                let reader = csv::Reader::from_path(path)
                    .with_context(|| format!("re-open {}", path.display()))?;
                let columns = columns.clone();
                let display = path.display().to_string();
                Ok(Box::new(reader.into_records().map(move |record| {
                    let record =
                        record.with_context(|| format!("malformed row in {display}"))?;
                    columns.parse_row(&record)
                })))
            }
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.inner, Inner::Lazy { .. })
    }

    /// Number of examples, when known without a file scan.
    pub fn len_hint(&self) -> Option<usize> {
        match &self.inner {
            Inner::Eager(examples) => Some(examples.len()),
            Inner::Lazy { .. } => None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
