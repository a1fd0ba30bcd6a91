//! Transcription datasets (`asr` and `text`)

use std::path::Path;
use tracing::info;

use super::bucket::Bucketable;
use super::dataset::{bucket, Batch, BucketDataset, DatasetOptions};
use super::features::{pad_features, pad_labels, FeatureStore};
use super::manifest::LengthTable;
use super::task::Task;
use crate::error::{BenchError, Result};

/// A feature file with its token transcription
#[derive(Debug, Clone, PartialEq)]
pub struct Transcribed {
    pub file_path: String,
    pub length: usize,
    pub tokens: Vec<i64>,
}

impl Bucketable for Transcribed {
    fn frame_len(&self) -> usize {
        self.length
    }

    fn label_len(&self) -> usize {
        self.tokens.len()
    }
}

/// Label-only view: frames are never loaded, so only labels drive splitting
struct TokensOnly(Transcribed);

impl Bucketable for TokensOnly {
    fn frame_len(&self) -> usize {
        0
    }

    fn label_len(&self) -> usize {
        self.0.tokens.len()
    }
}

/// Features with padded token labels, or token labels alone for `text`
#[derive(Debug)]
pub struct AsrDataset {
    task: Task,
    store: FeatureStore,
    buckets: Vec<Vec<Transcribed>>,
    run_mockingjay: bool,
}

impl AsrDataset {
    pub fn new<S: AsRef<str>>(
        root: &Path,
        sets: &[S],
        task: Task,
        options: DatasetOptions,
    ) -> Result<Self> {
        if !matches!(task, Task::Asr | Task::Text) {
            return Err(BenchError::Configuration {
                reason: format!("AsrDataset loads features and text labels, not '{}'", task),
            });
        }

        let mut filter = options.filter;
        if task == Task::Text {
            filter.max_timestep = 0;
        }

        let mut table = LengthTable::load(root, sets)?;
        table.apply(&filter);

        let mut rows = table
            .into_entries()
            .into_iter()
            .map(|e| {
                Ok(Transcribed {
                    tokens: e.label_tokens()?,
                    file_path: e.file_path,
                    length: e.length,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let buckets = if task == Task::Text {
            rows.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));
            options
                .policy
                .bucketize(rows.into_iter().map(TokensOnly))
                .into_iter()
                .map(|b| b.into_iter().map(|t| t.0).collect())
                .collect()
        } else {
            options.policy.bucketize(rows)
        };

        info!(
            "[Dataset] - {} buckets for task '{}' from {}",
            buckets.len(),
            task,
            root.display()
        );

        Ok(Self {
            task,
            store: FeatureStore::new(root),
            buckets,
            run_mockingjay: options.run_mockingjay,
        })
    }
}

impl BucketDataset for AsrDataset {
    fn task(&self) -> Task {
        self.task
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, index: usize) -> Result<Batch> {
        let items = bucket(&self.buckets, index)?;
        let tokens: Vec<Vec<i64>> = items.iter().map(|t| t.tokens.clone()).collect();
        let labels = pad_labels(&tokens);

        if self.task == Task::Text {
            return Ok(Batch::Labels(labels));
        }

        let paths: Vec<&str> = items.iter().map(|t| t.file_path.as_str()).collect();
        let features = pad_features(&self.store.load_all(&paths)?)?;
        Ok(Batch::Labeled { features, labels })
    }

    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>> {
        let items = bucket(&self.buckets, index)?;
        Ok(match self.task {
            Task::Text => items.iter().map(|t| t.tokens.len()).collect(),
            _ => items.iter().map(|t| t.length).collect(),
        })
    }

    fn run_mockingjay(&self) -> bool {
        self.run_mockingjay
    }
}
