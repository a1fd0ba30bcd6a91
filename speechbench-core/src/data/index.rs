//! Class indices for classification tasks
//!
//! Indices are built once while a dataset is constructed and are frozen
//! afterwards; parallel readers only ever see immutable tables.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{BenchError, Result};

/// Sentiment scores are shifted by this much to make class ids non-negative
pub const SENTIMENT_SHIFT: i64 = 3;

/// Number of sentiment classes (scores -3..=3)
pub const SENTIMENT_CLASSES: usize = 7;

/// Name of the phone symbol table under the phone directory
pub const PHONE2IDX_FILE: &str = "phone2idx.json";

/// Name of the unaligned-sample list under the phone directory
pub const UNALIGNED_FILE: &str = "unaligned.json";

/// Dense, frozen mapping from a domain key to a class id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassIndex {
    ids: HashMap<String, usize>,
}

impl ClassIndex {
    /// Class id of `key`
    pub fn get(&self, key: &str) -> Option<usize> {
        self.ids.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ids.contains_key(key)
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keys ordered by class id
    pub fn keys_by_id(&self) -> Vec<&str> {
        let mut keys: Vec<(&str, usize)> = self.ids.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        keys.sort_by_key(|&(_, id)| id);
        keys.into_iter().map(|(k, _)| k).collect()
    }
}

impl From<HashMap<String, usize>> for ClassIndex {
    fn from(ids: HashMap<String, usize>) -> Self {
        Self { ids }
    }
}

/// Speaker identity encoded in a sample path
///
/// `train-clean-100/103-1240-0000.npy` → `103`
pub fn speaker_from_path(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    stem.split('-').next().unwrap_or(stem)
}

/// Two-phase speaker index construction
///
/// Phase one scans the primary split and assigns ids in first-seen order.
/// Phase two merges the keys of an auxiliary split, giving every key not
/// already present the next free id.
#[derive(Debug, Default)]
pub struct SpeakerIndexBuilder {
    ids: HashMap<String, usize>,
    next_id: usize,
}

impl SpeakerIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign(&mut self, speaker: &str) {
        if !self.ids.contains_key(speaker) {
            self.ids.insert(speaker.to_string(), self.next_id);
            self.next_id += 1;
        }
    }

    /// Phase one: scan sample paths of the primary split
    pub fn scan_primary<'a, I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for path in paths {
            self.assign(speaker_from_path(path));
        }
        self
    }

    /// Phase two: merge an auxiliary index, skipping keys already assigned
    pub fn merge(mut self, other: &ClassIndex) -> Self {
        for key in other.keys_by_id() {
            self.assign(key);
        }
        self
    }

    /// Freeze the index
    pub fn build(self) -> ClassIndex {
        ClassIndex::from(self.ids)
    }
}

/// Speaker index of a single split
pub fn speaker_index<'a, I>(paths: I) -> ClassIndex
where
    I: IntoIterator<Item = &'a str>,
{
    SpeakerIndexBuilder::new().scan_primary(paths).build()
}

/// Phone symbol table and the set of samples without phone alignments
#[derive(Debug, Clone, Default)]
pub struct PhoneTable {
    /// Phone symbol → class id
    pub phone2idx: ClassIndex,
    /// Feature paths with no usable phone-boundary label
    pub unaligned: HashSet<String>,
}

impl PhoneTable {
    /// Load `phone2idx.json` and `unaligned.json` from `phone_path`
    pub fn load(phone_path: &Path) -> Result<Self> {
        let phone2idx: HashMap<String, usize> = read_json(&phone_path.join(PHONE2IDX_FILE))?;
        let unaligned: HashSet<String> = read_json(&phone_path.join(UNALIGNED_FILE))?;
        Ok(Self {
            phone2idx: ClassIndex::from(phone2idx),
            unaligned,
        })
    }

    /// Number of phone classes
    pub fn class_num(&self) -> usize {
        self.phone2idx.len()
    }

    pub fn is_unaligned(&self, file_path: &str) -> bool {
        self.unaligned.contains(file_path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BenchError::FeatureNotFound {
            path: path.to_path_buf(),
        },
        _ => BenchError::Io(e),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| BenchError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Sentiment class of an averaged annotator score
///
/// The score is truncated toward zero, then shifted from `-3..=3` into `0..7`.
pub fn sentiment_class(score: f64) -> Result<i64> {
    if !score.is_finite() {
        return Err(BenchError::InvalidInput {
            reason: format!("sentiment score {} is not finite", score),
        });
    }
    let class = score.trunc() as i64 + SENTIMENT_SHIFT;
    if !(0..SENTIMENT_CLASSES as i64).contains(&class) {
        return Err(BenchError::InvalidInput {
            reason: format!("sentiment score {} outside [-3, 3]", score),
        });
    }
    Ok(class)
}
