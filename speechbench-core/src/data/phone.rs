//! Frame-level phone classification dataset

use rand::Rng;
use std::path::Path;
use tracing::{info, warn};

use super::dataset::{bucket, Batch, BucketDataset, DatasetOptions};
use super::features::{pad_features, pad_labels, FeatureStore};
use super::index::PhoneTable;
use super::manifest::{LengthTable, ManifestEntry};
use super::matcher::match_length;
use super::task::Task;
use crate::error::{BenchError, Result};

/// Below this many rows a sub-sampled set is duplicated
pub const MIN_WORKING_SIZE: usize = 200;

/// Number of doubling passes applied to a small sub-sampled set
pub const DUPLICATION_PASSES: u32 = 4;

/// Randomly keep `floor(len * proportion)` rows without replacement
///
/// Row order is preserved, so a length-sorted input stays sorted. When fewer
/// than [`MIN_WORKING_SIZE`] rows remain, the sampled set is concatenated
/// with itself `DUPLICATION_PASSES` times, giving sorted runs of the whole set
/// back to back.
pub fn subsample<T: Clone, R: Rng + ?Sized>(
    rows: Vec<T>,
    proportion: f64,
    rng: &mut R,
) -> Result<Vec<T>> {
    if !(proportion > 0.0 && proportion <= 1.0) {
        return Err(BenchError::InvalidRange {
            name: "train_proportion",
            value: proportion,
            expected: "(0.0, 1.0]",
        });
    }
    if proportion == 1.0 {
        return Ok(rows);
    }

    let total = rows.len();
    let chosen = (total as f64 * proportion) as usize;
    let mut picks = rand::seq::index::sample(rng, total, chosen).into_vec();
    picks.sort_unstable();
    let sampled: Vec<T> = picks.into_iter().map(|i| rows[i].clone()).collect();

    info!("[Dataset] - Truncating dataset size from {} to {}", total, sampled.len());

    if sampled.is_empty() || sampled.len() >= MIN_WORKING_SIZE {
        return Ok(sampled);
    }

    let copies = 1usize << DUPLICATION_PASSES;
    warn!(
        "[Dataset] - {} samples is below {}, duplicating {}x",
        sampled.len(),
        MIN_WORKING_SIZE,
        copies
    );
    let mut doubled = sampled;
    doubled.reserve(doubled.len() * (copies - 1));
    for _ in 0..DUPLICATION_PASSES {
        doubled.extend_from_within(..);
    }
    Ok(doubled)
}

/// Features with frame-aligned phone labels
///
/// Label arrays live under the phone directory at the same relative path as
/// their feature array.
#[derive(Debug)]
pub struct PhoneDataset {
    features: FeatureStore,
    labels: FeatureStore,
    phones: PhoneTable,
    buckets: Vec<Vec<ManifestEntry>>,
    run_mockingjay: bool,
}

impl PhoneDataset {
    pub fn new<S: AsRef<str>, R: Rng + ?Sized>(
        root: &Path,
        phone_path: &Path,
        sets: &[S],
        options: DatasetOptions,
        train_proportion: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let phones = PhoneTable::load(phone_path)?;
        info!("[Dataset] - Possible phone classes: {}", phones.class_num());

        let mut table = LengthTable::load(root, sets)?;
        table.apply(&options.filter);

        let rows: Vec<ManifestEntry> = subsample(table.into_entries(), train_proportion, rng)?
            .into_iter()
            .filter(|e| !phones.is_unaligned(&e.file_path))
            .collect();

        let buckets = options.policy.bucketize(rows);
        info!("[Dataset] - {} phone buckets from {}", buckets.len(), root.display());

        Ok(Self {
            features: FeatureStore::new(root),
            labels: FeatureStore::new(phone_path),
            phones,
            buckets,
            run_mockingjay: options.run_mockingjay,
        })
    }

    pub fn phones(&self) -> &PhoneTable {
        &self.phones
    }
}

impl BucketDataset for PhoneDataset {
    fn task(&self) -> Task {
        Task::Phone
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let entries = bucket(&self.buckets, index)?;

        let mut features = Vec::with_capacity(entries.len());
        let mut labels = Vec::with_capacity(entries.len());
        for entry in entries {
            let x = self.features.load(&entry.file_path)?;
            let phones = self.labels.load_labels(&entry.file_path)?;
            features.push(match_length(x.view(), phones.len())?);
            labels.push(phones);
        }

        Ok(Batch::Labeled {
            features: pad_features(&features)?,
            labels: pad_labels(&labels),
        })
    }

    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>> {
        Ok(bucket(&self.buckets, index)?.iter().map(|e| e.length).collect())
    }

    fn class_num(&self) -> Option<usize> {
        Some(self.phones.class_num())
    }

    fn run_mockingjay(&self) -> bool {
        self.run_mockingjay
    }
}
