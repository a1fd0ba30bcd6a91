//! Spectrogram datasets (`spec` and `duo`)

use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::bucket::Bucketable;
use super::dataset::{bucket, Batch, BucketDataset, DatasetOptions};
use super::features::{pad_features, FeatureStore};
use super::manifest::{LengthTable, ManifestEntry};
use super::task::Task;
use crate::error::{BenchError, Result};

/// Features only
#[derive(Debug)]
pub struct MelDataset {
    store: FeatureStore,
    buckets: Vec<Vec<ManifestEntry>>,
    run_mockingjay: bool,
}

impl MelDataset {
    pub fn new<S: AsRef<str>>(root: &Path, sets: &[S], options: DatasetOptions) -> Result<Self> {
        let mut table = LengthTable::load(root, sets)?;
        table.apply(&options.filter);
        let buckets = options.policy.bucketize(table.into_entries());

        info!("[Dataset] - {} spectrogram buckets from {}", buckets.len(), root.display());

        Ok(Self {
            store: FeatureStore::new(root),
            buckets,
            run_mockingjay: options.run_mockingjay,
        })
    }
}

impl BucketDataset for MelDataset {
    fn task(&self) -> Task {
        Task::Spec
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let entries = bucket(&self.buckets, index)?;
        let paths: Vec<&str> = entries.iter().map(|e| e.file_path.as_str()).collect();
        Ok(Batch::Features(pad_features(&self.store.load_all(&paths)?)?))
    }

    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>> {
        Ok(bucket(&self.buckets, index)?.iter().map(|e| e.length).collect())
    }

    fn run_mockingjay(&self) -> bool {
        self.run_mockingjay
    }
}

/// A source spectrogram and its target counterpart
#[derive(Debug, Clone, PartialEq)]
pub struct DuoPair {
    pub source: ManifestEntry,
    pub target_path: String,
}

impl Bucketable for DuoPair {
    fn frame_len(&self) -> usize {
        self.source.length
    }
}

/// Source features paired with a target spectrogram (e.g. mel → linear)
#[derive(Debug)]
pub struct MelLinearDataset {
    source: FeatureStore,
    target: FeatureStore,
    buckets: Vec<Vec<DuoPair>>,
}

impl MelLinearDataset {
    /// Targets are matched to sources by `file_path`
    pub fn new<S: AsRef<str>>(
        root: &Path,
        target_root: &Path,
        sets: &[S],
        options: DatasetOptions,
    ) -> Result<Self> {
        let mut table = LengthTable::load(root, sets)?;
        table.apply(&options.filter);

        let targets: HashMap<String, ManifestEntry> = LengthTable::load(target_root, sets)?
            .into_entries()
            .into_iter()
            .map(|e| (e.file_path.clone(), e))
            .collect();

        let pairs = table
            .into_entries()
            .into_iter()
            .map(|source| match targets.get(&source.file_path) {
                Some(t) => Ok(DuoPair {
                    target_path: t.file_path.clone(),
                    source,
                }),
                None => Err(BenchError::ManifestInvalid {
                    path: target_root.to_path_buf(),
                    reason: format!("no target entry for '{}'", source.file_path),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let buckets = options.policy.bucketize(pairs);
        info!(
            "[Dataset] - {} duo buckets from {} with targets from {}",
            buckets.len(),
            root.display(),
            target_root.display()
        );

        Ok(Self {
            source: FeatureStore::new(root),
            target: FeatureStore::new(target_root),
            buckets,
        })
    }
}

impl BucketDataset for MelLinearDataset {
    fn task(&self) -> Task {
        Task::Duo
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let pairs = bucket(&self.buckets, index)?;
        let sources: Vec<&str> = pairs.iter().map(|p| p.source.file_path.as_str()).collect();
        let targets: Vec<&str> = pairs.iter().map(|p| p.target_path.as_str()).collect();

        Ok(Batch::Duo {
            source: pad_features(&self.source.load_all(&sources)?)?,
            target: pad_features(&self.target.load_all(&targets)?)?,
        })
    }

    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>> {
        Ok(bucket(&self.buckets, index)?.iter().map(|p| p.source.length).collect())
    }

    // Duo batches always go through masked acoustic model preprocessing
    fn run_mockingjay(&self) -> bool {
        true
    }
}
