//! Bucket prefetcher
//!
//! Runs on a separate task, materializing buckets ahead of consumption.
//! Up to `num_workers` buckets are loaded concurrently on the blocking pool;
//! batches are delivered strictly in epoch order.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::dataset::{Batch, BucketDataset};
use crate::error::{BenchError, Result};

/// Async prefetcher that loads buckets ahead of consumption
pub struct Prefetcher {
    /// Channel to send batches to the loader
    sender: mpsc::Sender<Result<Batch>>,
    /// Bucket indices still to load, in epoch order
    order: VecDeque<usize>,
    /// Dataset being materialized
    dataset: Arc<dyn BucketDataset>,
    /// Concurrent bucket loads
    num_workers: usize,
}

impl Prefetcher {
    /// Create a new prefetcher; zero workers is treated as one
    pub fn new(
        sender: mpsc::Sender<Result<Batch>>,
        order: Vec<usize>,
        dataset: Arc<dyn BucketDataset>,
        num_workers: usize,
    ) -> Self {
        Self {
            sender,
            order: VecDeque::from(order),
            dataset,
            num_workers: num_workers.max(1),
        }
    }

    fn spawn_load(&self, index: usize) -> JoinHandle<Result<Batch>> {
        let dataset = Arc::clone(&self.dataset);
        tokio::task::spawn_blocking(move || dataset.get(index))
    }

    /// Run the prefetcher loop
    pub async fn run(mut self) {
        debug!(
            "Prefetcher starting with {} buckets, {} workers",
            self.order.len(),
            self.num_workers
        );

        let mut in_flight: VecDeque<(usize, JoinHandle<Result<Batch>>)> = VecDeque::new();

        loop {
            while in_flight.len() < self.num_workers {
                match self.order.pop_front() {
                    Some(index) => in_flight.push_back((index, self.spawn_load(index))),
                    None => break,
                }
            }

            let Some((index, handle)) = in_flight.pop_front() else {
                break;
            };

            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(BenchError::Internal {
                    message: format!("worker for bucket {} failed: {}", index, e),
                }),
            };

            if let Err(e) = &result {
                error!("Failed to load bucket {}: {}", index, e);
            }

            if self.sender.send(result).await.is_err() {
                debug!("Prefetcher: consumer dropped, stopping");
                return;
            }
        }

        debug!("Prefetcher completed, all buckets processed");
    }
}
