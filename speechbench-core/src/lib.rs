//! Speechbench Core - Bucketed data pipeline for speech representation benchmarks
//!
//! This crate turns precomputed acoustic features and length manifests into
//! length-homogeneous batches for downstream tasks:
//! - Length-sorted bucketing with long-sequence halving
//! - Task datasets (asr, text, spec, duo, phone, sentiment, speaker)
//! - Feature/label length matching and padding
//! - Batch-of-one loaders with async prefetching

pub mod config;
pub mod data;
pub mod error;

pub use config::DataConfig;
pub use data::{get_dataloader, Batch, BucketDataset, BucketLoader, Split, Task};
pub use error::{BenchError, Result};

/// Default prefetch buffer size
pub const DEFAULT_PREFETCH_BUFFER_SIZE: usize = 4;
