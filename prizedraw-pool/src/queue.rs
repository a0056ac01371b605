use std::sync::Arc;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health::PoolRegenerator;

/// Background pool upkeep for one (event, size) key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplenishJob {
    /// One more pool if the key sits below `target`
    TopUp { event_id: Uuid, quantity_size: u8, target: usize },
    /// Fill the key back up to `target`
    Shortfall { event_id: Uuid, quantity_size: u8, target: usize },
    /// Retire the key's pools and draw `count` fresh ones
    Regenerate { event_id: Uuid, quantity_size: u8, count: usize },
}

impl ReplenishJob {
    fn label(&self) -> &'static str {
        match self {
            ReplenishJob::TopUp { .. } => "top_up",
            ReplenishJob::Shortfall { .. } => "shortfall",
            ReplenishJob::Regenerate { .. } => "regenerate",
        }
    }
}

#[derive(Clone)]
pub struct ReplenishMetrics {
    pub backlog: IntGauge,
    pub processed: IntCounterVec,
    pub failed: IntCounterVec,
    pub dropped: IntCounterVec,
}

impl ReplenishMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let backlog = IntGauge::new("prizedraw_replenish_backlog", "Replenish jobs waiting for the worker")?;
        let processed = IntCounterVec::new(
            Opts::new("prizedraw_replenish_processed_total", "Replenish jobs completed"),
            &["job"],
        )?;
        let failed = IntCounterVec::new(
            Opts::new("prizedraw_replenish_failed_total", "Replenish jobs that returned an error"),
            &["job"],
        )?;
        let dropped = IntCounterVec::new(
            Opts::new("prizedraw_replenish_dropped_total", "Replenish jobs discarded because the queue was full"),
            &["job"],
        )?;

        registry.register(Box::new(backlog.clone()))?;
        registry.register(Box::new(processed.clone()))?;
        registry.register(Box::new(failed.clone()))?;
        registry.register(Box::new(dropped.clone()))?;

        Ok(Self {
            backlog,
            processed,
            failed,
            dropped,
        })
    }
}

/// Producer side of the bounded replenish channel. Enqueueing never waits.
#[derive(Clone)]
pub struct ReplenishQueue {
    tx: Sender<ReplenishJob>,
    metrics: ReplenishMetrics,
}

impl ReplenishQueue {
    pub fn new(capacity: usize, metrics: ReplenishMetrics) -> (Self, Receiver<ReplenishJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, metrics }, rx)
    }

    pub fn metrics(&self) -> &ReplenishMetrics {
        &self.metrics
    }

    /// Returns `false` when the job was dropped.
    pub fn enqueue(&self, job: ReplenishJob) -> bool {
        let label = job.label();
        // Counted before the send so the worker's decrement never sees it missing.
        self.metrics.backlog.inc();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!("Replenish queue full, dropping {:?}", job);
                self.metrics.backlog.dec();
                self.metrics.dropped.with_label_values(&[label]).inc();
                false
            }
            Err(TrySendError::Closed(job)) => {
                error!("Replenish worker is gone, dropping {:?}", job);
                self.metrics.backlog.dec();
                self.metrics.dropped.with_label_values(&[label]).inc();
                false
            }
        }
    }
}

/// Drains the replenish channel one job at a time.
pub struct ReplenishWorker {
    rx: Receiver<ReplenishJob>,
    regenerator: Arc<PoolRegenerator>,
    metrics: ReplenishMetrics,
}

impl ReplenishWorker {
    pub fn new(rx: Receiver<ReplenishJob>, regenerator: Arc<PoolRegenerator>, metrics: ReplenishMetrics) -> Self {
        Self { rx, regenerator, metrics }
    }

    /// Runs until every queue handle has been dropped.
    pub async fn run(mut self) {
        info!("Replenish worker started");
        while let Some(job) = self.rx.recv().await {
            self.metrics.backlog.dec();
            self.process(job).await;
        }
        info!("Replenish worker stopped");
    }

    async fn process(&self, job: ReplenishJob) {
        let label = job.label();
        let result = match job {
            ReplenishJob::TopUp { event_id, quantity_size, target } => {
                self.regenerator.fill_to(event_id, quantity_size, target, 1).await
            }
            ReplenishJob::Shortfall { event_id, quantity_size, target } => {
                self.regenerator.fill_to(event_id, quantity_size, target, target).await
            }
            ReplenishJob::Regenerate { event_id, quantity_size, count } => {
                self.regenerator.regenerate(event_id, quantity_size, count).await
            }
        };

        // Failures wait for the next low-water check or claim to try again.
        match result {
            Ok(_) => self.metrics.processed.with_label_values(&[label]).inc(),
            Err(e) => {
                error!("Replenish job {} failed: {}", label, e);
                self.metrics.failed.with_label_values(&[label]).inc();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::PoolGenerator;
    use prizedraw_catalog::{InventoryItem, PricingConfig};
    use prizedraw_core::repository::PoolRepository;
    use prizedraw_store::InMemoryStore;

    fn metrics() -> ReplenishMetrics {
        ReplenishMetrics::new(&Registry::new()).unwrap()
    }

    fn top_up(event_id: Uuid) -> ReplenishJob {
        ReplenishJob::TopUp { event_id, quantity_size: 1, target: 5 }
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (queue, _rx) = ReplenishQueue::new(1, metrics());
        let event_id = Uuid::new_v4();

        assert!(queue.enqueue(top_up(event_id)));
        assert!(!queue.enqueue(top_up(event_id)));

        assert_eq!(queue.metrics().backlog.get(), 1);
        assert_eq!(queue.metrics().dropped.with_label_values(&["top_up"]).get(), 1);
    }

    #[test]
    fn test_closed_queue_leaves_backlog_untouched() {
        let (queue, rx) = ReplenishQueue::new(4, metrics());
        drop(rx);

        assert!(!queue.enqueue(top_up(Uuid::new_v4())));
        assert_eq!(queue.metrics().backlog.get(), 0);
        assert_eq!(queue.metrics().dropped.with_label_values(&["top_up"]).get(), 1);
    }

    #[tokio::test]
    async fn test_worker_drains_jobs() {
        let store = Arc::new(InMemoryStore::new());
        let event_id = Uuid::new_v4();
        store
            .seed_event(event_id, vec![
                InventoryItem::ticket_level(event_id, "Lower", 20000, 10),
                InventoryItem::collectible(event_id, "Pin", 500, 10),
            ])
            .await;

        let regenerator = Arc::new(PoolRegenerator::new(
            store.clone(),
            store.clone(),
            PoolGenerator::new(PricingConfig::default()),
        ));
        let metrics = metrics();
        let (queue, rx) = ReplenishQueue::new(8, metrics.clone());

        queue.enqueue(ReplenishJob::Regenerate { event_id, quantity_size: 1, count: 3 });
        queue.enqueue(top_up(event_id));
        queue.enqueue(ReplenishJob::Shortfall { event_id: Uuid::new_v4(), quantity_size: 1, target: 5 });
        drop(queue);

        ReplenishWorker::new(rx, regenerator, metrics.clone()).run().await;

        assert_eq!(store.count_available(event_id, 1).await.unwrap(), 4);
        assert_eq!(metrics.backlog.get(), 0);
        assert_eq!(metrics.processed.with_label_values(&["regenerate"]).get(), 1);
        assert_eq!(metrics.processed.with_label_values(&["top_up"]).get(), 1);
        assert_eq!(metrics.failed.with_label_values(&["shortfall"]).get(), 1);
    }
}
