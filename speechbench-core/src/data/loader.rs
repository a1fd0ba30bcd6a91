//! Batch-of-one data loader
//!
//! Buckets are pre-grouped by the dataset, so each step fetches exactly one
//! bucket. Iteration is either synchronous ([`BucketLoader::iter`]) or
//! prefetched by background workers ([`BucketLoader::stream`]).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::dataset::{Batch, BucketDataset};
use super::dispatch::rng_for;
use super::prefetcher::Prefetcher;
use crate::error::{BenchError, Result};
use crate::DEFAULT_PREFETCH_BUFFER_SIZE;

/// Configuration for the bucket loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Shuffle bucket order every epoch
    pub shuffle: bool,
    /// Concurrent bucket loads when streaming
    pub num_workers: usize,
    /// Batches buffered ahead of the consumer
    pub prefetch_count: usize,
    /// Shuffle seed (entropy when absent)
    pub seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            num_workers: 1,
            prefetch_count: DEFAULT_PREFETCH_BUFFER_SIZE,
            seed: None,
        }
    }
}

/// Iterates one pre-built bucket per step
pub struct BucketLoader {
    dataset: Arc<dyn BucketDataset>,
    config: LoaderConfig,
    rng: StdRng,
    epochs_started: u64,
}

impl BucketLoader {
    pub fn new(dataset: Arc<dyn BucketDataset>, config: LoaderConfig) -> Self {
        let rng = rng_for(config.seed);
        Self {
            dataset,
            config,
            rng,
            epochs_started: 0,
        }
    }

    /// Batches per epoch
    pub fn num_batches(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn dataset(&self) -> &Arc<dyn BucketDataset> {
        &self.dataset
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Epochs started so far
    pub fn epochs_started(&self) -> u64 {
        self.epochs_started
    }

    /// Bucket order of the next epoch
    fn next_order(&mut self) -> Vec<usize> {
        self.epochs_started += 1;
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.config.shuffle {
            order.shuffle(&mut self.rng);
        }
        order
    }

    /// Iterate one epoch on the calling thread
    pub fn iter(&mut self) -> BucketIter<'_> {
        let order = self.next_order();
        BucketIter {
            dataset: self.dataset.as_ref(),
            order: order.into_iter(),
        }
    }

    /// Start one prefetched epoch on the current Tokio runtime
    pub fn stream(&mut self) -> Result<EpochStream> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| BenchError::Internal {
            message: format!("streaming requires a Tokio runtime: {}", e),
        })?;

        let order = self.next_order();
        let total = order.len();
        let (sender, receiver) = mpsc::channel(self.config.prefetch_count.max(1));
        let prefetcher = Prefetcher::new(
            sender,
            order,
            Arc::clone(&self.dataset),
            self.config.num_workers,
        );
        let handle = runtime.spawn(prefetcher.run());

        Ok(EpochStream {
            receiver,
            handle: Some(handle),
            total,
            delivered: 0,
        })
    }
}

/// Synchronous epoch iterator
pub struct BucketIter<'a> {
    dataset: &'a dyn BucketDataset,
    order: std::vec::IntoIter<usize>,
}

impl Iterator for BucketIter<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.order.next()?;
        Some(self.dataset.get(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl ExactSizeIterator for BucketIter<'_> {}

/// One prefetched epoch
pub struct EpochStream {
    /// Channel to receive batches from the prefetcher
    receiver: mpsc::Receiver<Result<Batch>>,
    /// Task handle for the prefetcher
    handle: Option<tokio::task::JoinHandle<()>>,
    total: usize,
    delivered: usize,
}

impl EpochStream {
    /// Next batch, `None` at the end of the epoch
    pub async fn recv(&mut self) -> Option<Result<Batch>> {
        let item = self.receiver.recv().await;
        if item.is_some() {
            self.delivered += 1;
        }
        item
    }

    /// Next batch, `DataExhausted` at the end of the epoch
    pub async fn next_batch(&mut self) -> Result<Batch> {
        self.recv().await.unwrap_or(Err(BenchError::DataExhausted))
    }

    /// Batches delivered so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Batches still to come this epoch
    pub fn remaining(&self) -> usize {
        self.total - self.delivered
    }

    /// Stop the epoch early and wait for the prefetcher
    pub async fn shutdown(mut self) {
        // Dropping the receiver makes the prefetcher's next send fail
        self.receiver.close();
        while self.receiver.recv().await.is_some() {}

        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }

        debug!("EpochStream shutdown complete, delivered {} batches", self.delivered);
    }
}
