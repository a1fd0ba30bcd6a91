//! Utterance-level speaker identification dataset
//!
//! Class ids must agree between train and test, so the index is built from
//! the iterated split and then merged with its paired split before the
//! iterated split is bucketed.

use ndarray::Array1;
use std::path::Path;
use tracing::info;

use super::dataset::{bucket, Batch, BucketDataset, DatasetOptions};
use super::features::{pad_features, FeatureStore};
use super::index::{speaker_from_path, speaker_index, ClassIndex, SpeakerIndexBuilder};
use super::manifest::{LengthTable, ManifestEntry};
use super::task::Task;
use crate::error::{BenchError, Result};

#[derive(Debug)]
pub struct SpeakerDataset {
    store: FeatureStore,
    speakers: ClassIndex,
    buckets: Vec<Vec<ManifestEntry>>,
    run_mockingjay: bool,
}

impl SpeakerDataset {
    /// `primary` is iterated; `paired` only contributes speakers to the index
    pub fn new(root: &Path, primary: &str, paired: &str, options: DatasetOptions) -> Result<Self> {
        let other = LengthTable::load(root, &[paired])?;
        let other_index = speaker_index(other.entries().iter().map(|e| e.file_path.as_str()));

        let mut table = LengthTable::load(root, &[primary])?;

        info!("[Dataset] - Computing speaker class...");
        let speakers = SpeakerIndexBuilder::new()
            .scan_primary(table.entries().iter().map(|e| e.file_path.as_str()))
            .merge(&other_index)
            .build();
        info!("[Dataset] - Possible speaker classes: {}", speakers.len());

        table.apply(&options.filter);
        let buckets = options.policy.bucketize(table.into_entries());

        Ok(Self {
            store: FeatureStore::new(root),
            speakers,
            buckets,
            run_mockingjay: options.run_mockingjay,
        })
    }

    pub fn speakers(&self) -> &ClassIndex {
        &self.speakers
    }
}

impl BucketDataset for SpeakerDataset {
    fn task(&self) -> Task {
        Task::Speaker
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let entries = bucket(&self.buckets, index)?;
        let paths: Vec<&str> = entries.iter().map(|e| e.file_path.as_str()).collect();
        let features = pad_features(&self.store.load_all(&paths)?)?;

        let labels = entries
            .iter()
            .map(|e| {
                let speaker = speaker_from_path(&e.file_path);
                self.speakers
                    .get(speaker)
                    .map(|id| id as i64)
                    .ok_or_else(|| BenchError::Internal {
                        message: format!("speaker '{}' missing from index", speaker),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Batch::Utterance {
            features,
            labels: Array1::from(labels),
        })
    }

    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>> {
        Ok(bucket(&self.buckets, index)?.iter().map(|e| e.length).collect())
    }

    fn class_num(&self) -> Option<usize> {
        Some(self.speakers.len())
    }

    fn run_mockingjay(&self) -> bool {
        self.run_mockingjay
    }
}
