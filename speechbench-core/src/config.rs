//! Data pipeline configuration
//!
//! Mirrors the `data` section of a benchmark experiment config. Every field
//! has a default so partial JSON documents deserialize.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};
use crate::DEFAULT_PREFETCH_BUFFER_SIZE;

/// Inputs of the dataset dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the task manifests and feature arrays
    pub data_path: PathBuf,
    /// Bucket size for the train and text splits
    pub batch_size: usize,
    /// Bucket size for the dev and test splits
    pub dev_batch_size: usize,
    /// Drop rows with at least this many frames (0 = keep all)
    pub max_timestep: usize,
    /// Drop rows with at least this many label tokens (0 = keep all)
    pub max_label_len: usize,
    /// Prefetch workers
    pub n_jobs: usize,
    pub train_set: Vec<String>,
    pub dev_set: Vec<String>,
    pub test_set: Vec<String>,
    /// Target spectrogram root (`duo`)
    pub target_path: Option<PathBuf>,
    /// Phone label root (`phone`)
    pub phone_path: Option<PathBuf>,
    /// Sentiment corpus root (`sentiment`)
    pub sentiment_path: Option<PathBuf>,
    /// Beam decoding on test forces one sample per bucket
    pub decode_beam_size: Option<usize>,
    /// Mark batches for masked acoustic model preprocessing
    pub run_mockingjay: bool,
    /// Fraction of the training set to keep (`phone`)
    pub train_proportion: f64,
    /// Override of the task's frame threshold for halving buckets
    pub half_batchsize_time: Option<usize>,
    /// Override of the label threshold for halving buckets
    pub half_batchsize_label: Option<usize>,
    /// Batches buffered ahead of the consumer
    pub prefetch_count: usize,
    /// Seed for shuffling and sub-sampling (entropy when absent)
    pub seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/libri_mel160_subword5000"),
            batch_size: 6,
            dev_batch_size: 8,
            max_timestep: 0,
            max_label_len: 0,
            n_jobs: 4,
            train_set: vec!["train-clean-100".into()],
            dev_set: vec!["dev-clean".into()],
            test_set: vec!["test-clean".into()],
            target_path: None,
            phone_path: None,
            sentiment_path: None,
            decode_beam_size: None,
            run_mockingjay: false,
            train_proportion: 1.0,
            half_batchsize_time: None,
            half_batchsize_label: None,
            prefetch_count: DEFAULT_PREFETCH_BUFFER_SIZE,
            seed: None,
        }
    }
}

impl DataConfig {
    /// Create a configuration rooted at `data_path`
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BenchError::Configuration {
            reason: format!("Deserialization failed: {}", e),
        })
    }

    /// Read a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }

    pub fn dev_batch_size(mut self, bs: usize) -> Self {
        self.dev_batch_size = bs;
        self
    }

    pub fn max_timestep(mut self, frames: usize) -> Self {
        self.max_timestep = frames;
        self
    }

    pub fn max_label_len(mut self, tokens: usize) -> Self {
        self.max_label_len = tokens;
        self
    }

    pub fn n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = n;
        self
    }

    pub fn sets(mut self, train: &[&str], dev: &[&str], test: &[&str]) -> Self {
        self.train_set = train.iter().map(|s| s.to_string()).collect();
        self.dev_set = dev.iter().map(|s| s.to_string()).collect();
        self.test_set = test.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn phone_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.phone_path = Some(path.into());
        self
    }

    pub fn sentiment_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sentiment_path = Some(path.into());
        self
    }

    pub fn decode_beam_size(mut self, beams: usize) -> Self {
        self.decode_beam_size = Some(beams);
        self
    }

    pub fn run_mockingjay(mut self, run: bool) -> Self {
        self.run_mockingjay = run;
        self
    }

    pub fn train_proportion(mut self, p: f64) -> Self {
        self.train_proportion = p;
        self
    }

    pub fn half_batchsize_time(mut self, frames: usize) -> Self {
        self.half_batchsize_time = Some(frames);
        self
    }

    pub fn half_batchsize_label(mut self, tokens: usize) -> Self {
        self.half_batchsize_label = Some(tokens);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject values that can never produce a usable dataset
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.dev_batch_size == 0 {
            return Err(BenchError::Configuration {
                reason: format!(
                    "batch sizes must be positive (batch_size={}, dev_batch_size={})",
                    self.batch_size, self.dev_batch_size
                ),
            });
        }

        if !(self.train_proportion > 0.0 && self.train_proportion <= 1.0) {
            return Err(BenchError::InvalidRange {
                name: "train_proportion",
                value: self.train_proportion,
                expected: "(0.0, 1.0]",
            });
        }

        if self.prefetch_count == 0 {
            return Err(BenchError::Configuration {
                reason: "prefetch_count must be positive".into(),
            });
        }

        Ok(())
    }
}
