//! Bucketed data pipeline
//!
//! Length manifests are filtered, sorted and grouped into fixed buckets up
//! front; loaders then fetch one bucket per step, optionally prefetched.

pub mod asr;
pub mod bucket;
pub mod dataset;
pub mod dispatch;
pub mod features;
pub mod index;
pub mod loader;
pub mod manifest;
pub mod matcher;
pub mod mel;
pub mod phone;
pub mod prefetcher;
pub mod sentiment;
pub mod speaker;
pub mod task;

pub use asr::AsrDataset;
pub use bucket::{BucketPolicy, Bucketable};
pub use dataset::{Batch, BucketDataset, DatasetOptions};
pub use dispatch::{build_dataset, get_dataloader, get_dataloader_by_name, SplitPlan};
pub use features::FeatureStore;
pub use index::{ClassIndex, PhoneTable, SpeakerIndexBuilder};
pub use loader::{BucketIter, BucketLoader, EpochStream, LoaderConfig};
pub use manifest::{LengthFilter, LengthTable, ManifestEntry};
pub use matcher::match_length;
pub use mel::{MelDataset, MelLinearDataset};
pub use phone::PhoneDataset;
pub use prefetcher::Prefetcher;
pub use sentiment::SentimentDataset;
pub use speaker::SpeakerDataset;
pub use task::{Split, Task};
