//! Concurrent consumption of the webhook update queue.

use super::handler::UpdateProcessor;
use crate::telegram::Update;
use ahash::AHashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

/// Number of recent `update_id`s remembered for duplicate detection.
pub const DEFAULT_DEDUP_WINDOW: usize = 1024;

/// Bounded memory of recently seen update ids.
#[derive(Debug)]
struct RecentUpdates {
    seen: AHashSet<i64>,
    order: VecDeque<i64>,
    capacity: usize,
}

impl RecentUpdates {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: AHashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns false if `update_id` is already in the window.
    fn insert(&mut self, update_id: i64) -> bool {
        if !self.seen.insert(update_id) {
            return false;
        }
        self.order.push_back(update_id);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }
}

/// Counters reported when the dispatcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: usize,
    pub duplicates: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs updates from the queue through a processor, a bounded number at a time.
pub struct UpdateDispatcher {
    processor: Arc<dyn UpdateProcessor>,
    max_concurrent: usize,
}

impl UpdateDispatcher {
    pub fn new(processor: Arc<dyn UpdateProcessor>, max_concurrent: usize) -> Self {
        Self {
            processor,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Consume `receiver` until every sender is dropped, then wait for
    /// in-flight updates to finish.
    pub async fn run(self, mut receiver: mpsc::Receiver<Update>) -> DispatchStats {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut recent = RecentUpdates::new(DEFAULT_DEDUP_WINDOW);
        let mut stats = DispatchStats::default();
        let mut tasks = JoinSet::new();

        tracing::info!(max_concurrent = self.max_concurrent, "Update dispatcher started");

        loop {
            tokio::select! {
                maybe_update = receiver.recv() => {
                    let Some(update) = maybe_update else { break };
                    stats.received += 1;

                    if !recent.insert(update.update_id) {
                        stats.duplicates += 1;
                        tracing::debug!(update_id = update.update_id, "Skipping duplicate update");
                        continue;
                    }

                    let permit = match Arc::clone(&semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            tracing::error!("Update semaphore closed: {}", e);
                            break;
                        }
                    };

                    let processor = Arc::clone(&self.processor);
                    tasks.spawn(async move {
                        let _permit = permit;
                        let update_id = update.update_id;
                        (update_id, processor.process(update).await)
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    record(&mut stats, joined);
                }
            }
        }

        if !tasks.is_empty() {
            tracing::info!(in_flight = tasks.len(), "Waiting for in-flight updates");
        }
        while let Some(joined) = tasks.join_next().await {
            record(&mut stats, joined);
        }

        tracing::info!(
            received = stats.received,
            duplicates = stats.duplicates,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Update dispatcher stopped"
        );
        stats
    }
}

fn record(
    stats: &mut DispatchStats,
    joined: std::result::Result<(i64, crate::Result<super::HandleOutcome>), tokio::task::JoinError>,
) {
    match joined {
        Ok((update_id, Ok(outcome))) => {
            stats.succeeded += 1;
            tracing::debug!(update_id, ?outcome, "Update handled");
        }
        Ok((update_id, Err(e))) => {
            stats.failed += 1;
            tracing::error!(update_id, error_kind = e.kind(), "Failed to handle update: {}", e);
        }
        Err(join_err) => {
            stats.failed += 1;
            tracing::error!("Update task panicked: {}", join_err);
        }
    }
}
