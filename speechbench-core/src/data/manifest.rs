//! Split manifests and the merged length table
//!
//! Each split is a CSV file `<root>/<split>.csv` with at least the columns
//! `file_path` and `length`, and optionally `label`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::data::bucket::Bucketable;
use crate::error::{BenchError, Result};

/// A single manifest row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path of the feature array, relative to the task root
    pub file_path: String,
    /// Number of frames (rows) in the feature array
    pub length: usize,
    /// Optional string-encoded label (`_`-joined token ids, or a score)
    #[serde(default)]
    pub label: Option<String>,
}

impl ManifestEntry {
    /// Create an unlabeled entry
    pub fn new(file_path: impl Into<String>, length: usize) -> Self {
        Self {
            file_path: file_path.into(),
            length,
            label: None,
        }
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of label tokens, 0 when the row carries no label
    pub fn label_len(&self) -> usize {
        match &self.label {
            Some(label) => label.matches('_').count() + 1,
            None => 0,
        }
    }

    /// Parse the label as a `_`-joined sequence of positive token ids
    pub fn label_tokens(&self) -> Result<Vec<i64>> {
        let label = self.label.as_deref().ok_or_else(|| BenchError::InvalidInput {
            reason: format!("{} has no label", self.file_path),
        })?;

        label
            .split('_')
            .map(|tok| {
                let id: i64 = tok.trim().parse().map_err(|_| BenchError::InvalidInput {
                    reason: format!("{}: bad label token '{}'", self.file_path, tok),
                })?;
                if id <= 0 {
                    return Err(BenchError::InvalidInput {
                        reason: format!("{}: label token {} is not positive", self.file_path, id),
                    });
                }
                Ok(id)
            })
            .collect()
    }

    /// Parse the label as a real-valued score
    pub fn label_score(&self) -> Result<f64> {
        let label = self.label.as_deref().ok_or_else(|| BenchError::InvalidInput {
            reason: format!("{} has no label", self.file_path),
        })?;
        label.trim().parse().map_err(|_| BenchError::InvalidInput {
            reason: format!("{}: bad label score '{}'", self.file_path, label),
        })
    }
}

// Feature-only variants bucket raw entries; label length never halves them
impl Bucketable for ManifestEntry {
    fn frame_len(&self) -> usize {
        self.length
    }
}

/// Length bounds used to drop overly long rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthFilter {
    /// Keep rows with `length < max_timestep` (0 = no bound)
    pub max_timestep: usize,
    /// Keep rows with label token count `< max_label_len` (0 = no bound)
    pub max_label_len: usize,
}

impl LengthFilter {
    /// A filter that keeps everything
    pub fn none() -> Self {
        Self::default()
    }

    /// Check whether an entry survives the filter
    pub fn keeps(&self, entry: &ManifestEntry) -> bool {
        if self.max_timestep > 0 && entry.length >= self.max_timestep {
            return false;
        }
        if self.max_label_len > 0 && entry.label.is_some() && entry.label_len() >= self.max_label_len {
            return false;
        }
        true
    }
}

/// Merged manifest of one or more splits, sorted by length descending
#[derive(Debug, Clone, Default)]
pub struct LengthTable {
    entries: Vec<ManifestEntry>,
}

impl LengthTable {
    /// Load and merge the manifests of `sets` under `root`
    pub fn load<S: AsRef<str>>(root: &Path, sets: &[S]) -> Result<Self> {
        let mut entries = Vec::new();
        for set in sets {
            entries.extend(read_split(root, set.as_ref())?);
        }
        Ok(Self::from_entries(entries))
    }

    /// Build a table from in-memory rows
    pub fn from_entries(mut entries: Vec<ManifestEntry>) -> Self {
        // Stable, so rows of equal length keep their manifest order
        entries.sort_by(|a, b| b.length.cmp(&a.length));
        Self { entries }
    }

    /// Drop rows rejected by `filter`
    pub fn apply(&mut self, filter: &LengthFilter) {
        let before = self.entries.len();
        self.entries.retain(|e| filter.keeps(e));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!("Dropped {} of {} rows exceeding {:?}", dropped, before, filter);
        }
    }

    /// Sorted rows
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Consume the table, returning its sorted rows
    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Path of a split manifest
pub fn split_path(root: &Path, split: &str) -> PathBuf {
    root.join(format!("{}.csv", split))
}

/// Read one split manifest in file order
pub fn read_split(root: &Path, split: &str) -> Result<Vec<ManifestEntry>> {
    let path = split_path(root, split);
    if !path.is_file() {
        return Err(BenchError::SplitNotFound {
            split: split.to_string(),
            path,
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|e| BenchError::ManifestInvalid {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<ManifestEntry>() {
        let entry = record.map_err(|e| BenchError::ManifestInvalid {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        rows.push(entry);
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
