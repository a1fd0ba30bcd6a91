//! Utterance-level sentiment dataset
//!
//! The manifest is `<sentiment_path>/<split>.csv` and features live under
//! `<sentiment_path>/<split>/`. Labels are averaged annotator scores in
//! `[-3, 3]`, truncated and shifted into seven classes. The class of an
//! utterance is broadcast over every frame of its padded sequence.

use ndarray::Array2;
use std::path::Path;
use tracing::info;

use super::bucket::Bucketable;
use super::dataset::{bucket, Batch, BucketDataset, DatasetOptions};
use super::features::{pad_features, FeatureStore};
use super::index::{sentiment_class, SENTIMENT_CLASSES};
use super::manifest::LengthTable;
use super::task::Task;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub file_path: String,
    pub length: usize,
    pub class: i64,
}

impl Bucketable for Scored {
    fn frame_len(&self) -> usize {
        self.length
    }
}

#[derive(Debug)]
pub struct SentimentDataset {
    store: FeatureStore,
    buckets: Vec<Vec<Scored>>,
    run_mockingjay: bool,
}

impl SentimentDataset {
    pub fn new(sentiment_path: &Path, split: &str, options: DatasetOptions) -> Result<Self> {
        let mut filter = options.filter;
        // Scores are not token sequences
        filter.max_label_len = 0;

        let mut table = LengthTable::load(sentiment_path, &[split])?;
        table.apply(&filter);

        let rows = table
            .into_entries()
            .into_iter()
            .map(|e| {
                Ok(Scored {
                    class: sentiment_class(e.label_score()?)?,
                    file_path: e.file_path,
                    length: e.length,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let buckets = options.policy.bucketize(rows);
        info!(
            "[Dataset] - {} sentiment buckets for split '{}' ({} classes)",
            buckets.len(),
            split,
            SENTIMENT_CLASSES
        );

        Ok(Self {
            store: FeatureStore::new(sentiment_path.join(split)),
            buckets,
            run_mockingjay: options.run_mockingjay,
        })
    }
}

impl BucketDataset for SentimentDataset {
    fn task(&self) -> Task {
        Task::Sentiment
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let items = bucket(&self.buckets, index)?;
        let paths: Vec<&str> = items.iter().map(|s| s.file_path.as_str()).collect();
        let features = pad_features(&self.store.load_all(&paths)?)?;

        let time = features.dim().1;
        let labels = Array2::from_shape_fn((items.len(), time), |(i, _)| items[i].class);
        Ok(Batch::Labeled { features, labels })
    }

    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>> {
        Ok(bucket(&self.buckets, index)?.iter().map(|s| s.length).collect())
    }

    fn class_num(&self) -> Option<usize> {
        Some(SENTIMENT_CLASSES)
    }

    fn run_mockingjay(&self) -> bool {
        self.run_mockingjay
    }
}
