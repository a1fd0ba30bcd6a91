//! Task/split dispatch
//!
//! Resolves a split into batch size, shuffle and drop policies, then builds
//! the dataset variant for a task.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::asr::AsrDataset;
use super::bucket::BucketPolicy;
use super::dataset::{BucketDataset, DatasetOptions};
use super::loader::{BucketLoader, LoaderConfig};
use super::manifest::LengthFilter;
use super::mel::{MelDataset, MelLinearDataset};
use super::phone::PhoneDataset;
use super::sentiment::SentimentDataset;
use super::speaker::SpeakerDataset;
use super::task::{Split, Task};
use crate::config::DataConfig;
use crate::error::{BenchError, Result};

/// Per-split loading policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub split: Split,
    /// Samples per bucket
    pub batch_size: usize,
    /// Shuffle bucket order every epoch
    pub shuffle: bool,
    /// Apply the max-length filters
    pub drop_too_long: bool,
    /// Prefetch workers
    pub n_jobs: usize,
    /// Manifest names to merge
    pub sets: Vec<String>,
}

impl SplitPlan {
    pub fn resolve(split: Split, config: &DataConfig) -> Self {
        match split {
            Split::Train | Split::Text => Self {
                split,
                batch_size: config.batch_size,
                shuffle: true,
                drop_too_long: true,
                n_jobs: config.n_jobs,
                sets: config.train_set.clone(),
            },
            Split::Dev => Self {
                split,
                batch_size: config.dev_batch_size,
                shuffle: false,
                drop_too_long: true,
                n_jobs: config.n_jobs,
                sets: config.dev_set.clone(),
            },
            Split::Test => Self {
                split,
                batch_size: if config.decode_beam_size.is_some() {
                    1
                } else {
                    config.dev_batch_size
                },
                shuffle: false,
                drop_too_long: false,
                // Stateful decoding is serialized
                n_jobs: 1,
                sets: config.test_set.clone(),
            },
        }
    }

    /// Config key of the set list this split iterates
    pub fn set_key(&self) -> &'static str {
        match self.split {
            Split::Train | Split::Text => "train_set",
            Split::Dev => "dev_set",
            Split::Test => "test_set",
        }
    }

    /// Length filter implied by the drop policy
    pub fn filter(&self, config: &DataConfig) -> LengthFilter {
        if self.drop_too_long {
            LengthFilter {
                max_timestep: config.max_timestep,
                max_label_len: config.max_label_len,
            }
        } else {
            LengthFilter::none()
        }
    }

    /// Bucketing policy for `task`, honoring configured threshold overrides
    pub fn policy(&self, task: Task, config: &DataConfig) -> BucketPolicy {
        BucketPolicy::new(self.batch_size)
            .with_time_threshold(
                config
                    .half_batchsize_time
                    .unwrap_or_else(|| task.default_half_batch_time()),
            )
            .with_label_threshold(
                config
                    .half_batchsize_label
                    .unwrap_or(BucketPolicy::HALF_BATCHSIZE_LABEL),
            )
    }
}

fn require<'a>(path: &'a Option<std::path::PathBuf>, task: Task, name: &'static str) -> Result<&'a Path> {
    path.as_deref().ok_or_else(|| BenchError::MissingAuxiliaryPath {
        task: task.to_string(),
        name,
    })
}

fn first_set<'a>(sets: &'a [String], task: Task, split: Split, name: &str) -> Result<&'a str> {
    sets.first()
        .map(String::as_str)
        .ok_or_else(|| BenchError::InvalidTaskSplit {
            task: task.to_string(),
            split: split.to_string(),
            reason: format!("`{}` is empty", name),
        })
}

/// Seeded RNG when a seed is configured, entropy-seeded otherwise
pub(crate) fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Build the dataset for `task` on `split`
pub fn build_dataset(split: Split, task: Task, config: &DataConfig) -> Result<Arc<dyn BucketDataset>> {
    config.validate()?;

    let plan = SplitPlan::resolve(split, config);
    if plan.sets.is_empty() {
        return Err(BenchError::Configuration {
            reason: format!("`{}` must name at least one split", plan.set_key()),
        });
    }

    // The text split reuses training samples as label sequences only
    let task = match (split, task) {
        (Split::Text, Task::Asr | Task::Text) => Task::Text,
        (Split::Text, _) => {
            return Err(BenchError::InvalidTaskSplit {
                task: task.to_string(),
                split: split.to_string(),
                reason: "the text split only yields token label sequences".into(),
            })
        }
        (_, task) => task,
    };

    let options = DatasetOptions::new(plan.policy(task, config))
        .with_filter(plan.filter(config))
        .with_mockingjay(config.run_mockingjay);
    let root = config.data_path.as_path();

    let dataset: Arc<dyn BucketDataset> = match task {
        Task::Asr | Task::Text => Arc::new(AsrDataset::new(root, &plan.sets, task, options)?),
        Task::Spec => Arc::new(MelDataset::new(root, &plan.sets, options)?),
        Task::Duo => {
            let target = require(&config.target_path, task, "target_path")?;
            Arc::new(MelLinearDataset::new(root, target, &plan.sets, options)?)
        }
        Task::Phone => {
            let phone_path = require(&config.phone_path, task, "phone_path")?;
            let proportion = if split == Split::Train {
                config.train_proportion
            } else {
                1.0
            };
            let mut rng = rng_for(config.seed);
            Arc::new(PhoneDataset::new(
                root,
                phone_path,
                &plan.sets,
                options,
                proportion,
                &mut rng,
            )?)
        }
        Task::Sentiment => {
            let sentiment_path = require(&config.sentiment_path, task, "sentiment_path")?;
            Arc::new(SentimentDataset::new(sentiment_path, split.as_str(), options)?)
        }
        Task::Speaker => {
            if !matches!(split, Split::Train | Split::Test) {
                return Err(BenchError::InvalidTaskSplit {
                    task: task.to_string(),
                    split: split.to_string(),
                    reason: "speaker classes need the paired train and test sets".into(),
                });
            }
            let train = first_set(&config.train_set, task, split, "train_set")?;
            let test = first_set(&config.test_set, task, split, "test_set")?;
            let (primary, paired) = if split == Split::Train {
                (train, test)
            } else {
                (test, train)
            };
            Arc::new(SpeakerDataset::new(root, primary, paired, options)?)
        }
    };

    if dataset.is_empty() {
        warn!("[Dataset] - '{}' on split '{}' produced no buckets", task, split);
    }
    Ok(dataset)
}

/// Build the batch-of-one loader for `task` on `split`
pub fn get_dataloader(split: Split, task: Task, config: &DataConfig) -> Result<BucketLoader> {
    let dataset = build_dataset(split, task, config)?;
    let plan = SplitPlan::resolve(split, config);

    info!(
        "[Dataloader] - {} buckets for '{}' on '{}' (shuffle={}, workers={})",
        dataset.len(),
        task,
        split,
        plan.shuffle,
        plan.n_jobs
    );

    Ok(BucketLoader::new(
        dataset,
        LoaderConfig {
            shuffle: plan.shuffle,
            num_workers: plan.n_jobs,
            prefetch_count: config.prefetch_count,
            seed: config.seed,
        },
    ))
}

/// String-keyed entry point for callers holding raw keywords
pub fn get_dataloader_by_name(split: &str, task: &str, config: &DataConfig) -> Result<BucketLoader> {
    get_dataloader(split.parse()?, task.parse()?, config)
}
