//! Length-aware bucketing
//!
//! Turns a length-descending sample stream into buckets of at most
//! `bucket_size` samples. A full bucket whose longest sequence exceeds a
//! threshold is emitted as two halves, which keeps the padded element count
//! of a step roughly bounded. Since the stream is sorted, the lengths within
//! one bucket are close and the declared maximum is a good proxy for the
//! padded footprint.

use serde::{Deserialize, Serialize};

/// Anything that can be placed in a bucket
pub trait Bucketable {
    /// Sequence length in frames
    fn frame_len(&self) -> usize;

    /// Label length in tokens (0 when unlabeled)
    fn label_len(&self) -> usize {
        0
    }
}

/// Bucket sizing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy {
    /// Samples per full bucket
    pub bucket_size: usize,
    /// Split a full bucket whose max frame length exceeds this
    pub half_batch_time: usize,
    /// Split a full bucket whose max label length exceeds this
    pub half_batch_label: usize,
}

impl BucketPolicy {
    /// Default frame threshold
    pub const HALF_BATCHSIZE_TIME: usize = 400;
    /// Frame threshold for tasks trained on longer contexts
    pub const LONG_CONTEXT_HALF_BATCHSIZE_TIME: usize = 1000;
    /// Default label threshold
    pub const HALF_BATCHSIZE_LABEL: usize = 150;

    /// Create a policy with default thresholds
    pub fn new(bucket_size: usize) -> Self {
        Self {
            bucket_size,
            half_batch_time: Self::HALF_BATCHSIZE_TIME,
            half_batch_label: Self::HALF_BATCHSIZE_LABEL,
        }
    }

    /// Override the frame threshold
    pub fn with_time_threshold(mut self, frames: usize) -> Self {
        self.half_batch_time = frames;
        self
    }

    /// Override the label threshold
    pub fn with_label_threshold(mut self, tokens: usize) -> Self {
        self.half_batch_label = tokens;
        self
    }

    /// Whether a full group with these maxima is emitted as two halves
    pub fn should_split(&self, max_frame: usize, max_label: usize) -> bool {
        self.bucket_size >= 2
            && (max_frame > self.half_batch_time || max_label > self.half_batch_label)
    }

    /// Group `items` into buckets, preserving order
    ///
    /// A `bucket_size` of 0 never fills a group, so everything lands in the
    /// trailing partial bucket.
    pub fn bucketize<T, I>(&self, items: I) -> Vec<Vec<T>>
    where
        T: Bucketable,
        I: IntoIterator<Item = T>,
    {
        let mut buckets = Vec::new();
        let mut pending: Vec<T> = Vec::with_capacity(self.bucket_size);

        for item in items {
            pending.push(item);

            if pending.len() == self.bucket_size {
                let max_frame = pending.iter().map(|s| s.frame_len()).max().unwrap_or(0);
                let max_label = pending.iter().map(|s| s.label_len()).max().unwrap_or(0);

                let mut full = std::mem::replace(&mut pending, Vec::with_capacity(self.bucket_size));
                if self.should_split(max_frame, max_label) {
                    let second = full.split_off(self.bucket_size / 2);
                    buckets.push(full);
                    buckets.push(second);
                } else {
                    buckets.push(full);
                }
            }
        }

        if !pending.is_empty() {
            buckets.push(pending);
        }

        buckets
    }
}
