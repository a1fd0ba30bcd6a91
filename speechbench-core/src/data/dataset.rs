//! Bucketed dataset abstraction
//!
//! Every task variant exposes the same capability: a number of pre-built
//! buckets and lazy materialization of one bucket into a padded batch.

use ndarray::{Array1, Array2, Array3};
use std::fmt;

use super::bucket::BucketPolicy;
use super::manifest::LengthFilter;
use super::task::Task;
use crate::error::{BenchError, Result};

/// One materialized bucket
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    /// Padded token labels `(batch, max_label_len)`
    Labels(Array2<i64>),
    /// Padded features `(batch, time, channels)`
    Features(Array3<f32>),
    /// Padded features with per-step labels `(batch, label_time)`
    Labeled {
        features: Array3<f32>,
        labels: Array2<i64>,
    },
    /// Source features with a padded target spectrogram
    Duo {
        source: Array3<f32>,
        target: Array3<f32>,
    },
    /// Padded features with one label per utterance `(batch,)`
    Utterance {
        features: Array3<f32>,
        labels: Array1<i64>,
    },
}

impl Batch {
    /// Input features, when the batch carries any
    pub fn features(&self) -> Option<&Array3<f32>> {
        match self {
            Batch::Labels(_) => None,
            Batch::Features(features)
            | Batch::Labeled { features, .. }
            | Batch::Utterance { features, .. } => Some(features),
            Batch::Duo { source, .. } => Some(source),
        }
    }

    /// Number of samples in the batch
    pub fn batch_size(&self) -> usize {
        match self {
            Batch::Labels(labels) => labels.nrows(),
            Batch::Features(features)
            | Batch::Labeled { features, .. }
            | Batch::Utterance { features, .. } => features.dim().0,
            Batch::Duo { source, .. } => source.dim().0,
        }
    }

    /// Padded time dimension of the batch
    pub fn time_len(&self) -> usize {
        match self {
            Batch::Labels(labels) => labels.ncols(),
            Batch::Features(features)
            | Batch::Labeled { features, .. }
            | Batch::Utterance { features, .. } => features.dim().1,
            Batch::Duo { source, .. } => source.dim().1,
        }
    }
}

/// Construction options shared by every variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetOptions {
    /// Bucketing policy, including task-specific thresholds
    pub policy: BucketPolicy,
    /// Length filter (all-zero when too-long rows are kept)
    pub filter: LengthFilter,
    /// Tell the consumer to apply masked acoustic model preprocessing
    pub run_mockingjay: bool,
}

impl DatasetOptions {
    pub fn new(policy: BucketPolicy) -> Self {
        Self {
            policy,
            filter: LengthFilter::none(),
            run_mockingjay: false,
        }
    }

    pub fn with_filter(mut self, filter: LengthFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_mockingjay(mut self, run: bool) -> Self {
        self.run_mockingjay = run;
        self
    }
}

/// A dataset whose items are whole buckets
///
/// Implementations are immutable after construction so that any number of
/// prefetch workers can call [`BucketDataset::get`] concurrently.
pub trait BucketDataset: Send + Sync + fmt::Debug {
    /// Task this dataset was built for
    fn task(&self) -> Task;

    /// Number of buckets
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load and pad bucket `index`
    fn get(&self, index: usize) -> Result<Batch>;

    /// True (unpadded) sequence lengths of bucket `index`, from the manifest
    fn bucket_lengths(&self, index: usize) -> Result<Vec<usize>>;

    /// Number of output classes for classification tasks
    fn class_num(&self) -> Option<usize> {
        None
    }

    /// Whether batches should go through masked acoustic model preprocessing
    fn run_mockingjay(&self) -> bool {
        false
    }

    /// Total number of samples across all buckets
    fn num_samples(&self) -> Result<usize> {
        (0..self.len())
            .map(|i| self.bucket_lengths(i).map(|l| l.len()))
            .sum()
    }
}

/// Bounds-check a bucket index
pub(crate) fn bucket<T>(buckets: &[T], index: usize) -> Result<&T> {
    buckets.get(index).ok_or(BenchError::IndexOutOfRange {
        index,
        len: buckets.len(),
    })
}
