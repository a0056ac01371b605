use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use prizedraw_catalog::{CatalogSnapshot, FeaturedPrizes};
use prizedraw_core::repository::{CatalogProvider, PoolRepository};
use prizedraw_shared::PrizePool;
use prizedraw_store::RedisClient;

use crate::generator::PoolGenerator;
use crate::queue::{ReplenishJob, ReplenishQueue};
use crate::PoolError;

/// Snapshot-to-store plumbing shared by the monitor and the replenish worker.
pub struct PoolRegenerator {
    catalog: Arc<dyn CatalogProvider>,
    pools: Arc<dyn PoolRepository>,
    generator: PoolGenerator,
    cache: Option<Arc<RedisClient>>,
    cache_ttl_seconds: u64,
}

impl PoolRegenerator {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        pools: Arc<dyn PoolRepository>,
        generator: PoolGenerator,
    ) -> Self {
        Self {
            catalog,
            pools,
            generator,
            cache: None,
            cache_ttl_seconds: 30,
        }
    }

    /// Refresh cached featured prizes whenever a fresh snapshot is read.
    pub fn with_featured_cache(mut self, cache: Arc<RedisClient>, ttl_seconds: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Retire every AVAILABLE pool for the key, then draw a fresh batch.
    pub async fn regenerate(&self, event_id: Uuid, quantity_size: u8, count: usize) -> Result<usize, PoolError> {
        let snapshot = self.snapshot(event_id).await?;

        let retired = self.pools.mark_stale(event_id, Some(quantity_size)).await?;
        if retired > 0 {
            debug!("Retired {} pools for event {} size {}", retired, event_id, quantity_size);
        }

        let inserted = self.store(self.draw(&snapshot, quantity_size, count)).await?;
        info!(
            "Generated {}/{} pools for event {} size {}",
            inserted, count, event_id, quantity_size
        );
        Ok(inserted)
    }

    /// Add pools until `target` are AVAILABLE, at most `limit` at a time, keeping existing ones.
    pub async fn fill_to(
        &self,
        event_id: Uuid,
        quantity_size: u8,
        target: usize,
        limit: usize,
    ) -> Result<usize, PoolError> {
        let available = self.pools.count_available(event_id, quantity_size).await?;
        if available >= target {
            return Ok(0);
        }

        let snapshot = self.snapshot(event_id).await?;
        let wanted = (target - available).min(limit);
        let inserted = self.store(self.draw(&snapshot, quantity_size, wanted)).await?;
        debug!(
            "Topped up event {} size {}: {} available, {} added",
            event_id, quantity_size, available, inserted
        );
        Ok(inserted)
    }

    pub async fn event_exists(&self, event_id: Uuid) -> Result<bool, PoolError> {
        Ok(self.catalog.snapshot(event_id).await?.is_some())
    }

    async fn snapshot(&self, event_id: Uuid) -> Result<CatalogSnapshot, PoolError> {
        let snapshot = self
            .catalog
            .snapshot(event_id)
            .await?
            .ok_or(PoolError::EventNotFound(event_id))?;

        self.refresh_featured(&snapshot).await;
        Ok(snapshot)
    }

    fn draw(&self, snapshot: &CatalogSnapshot, quantity_size: u8, count: usize) -> Vec<PrizePool> {
        let mut rng = rand::thread_rng();
        self.generator.draw_batch(snapshot, quantity_size, count, &mut rng)
    }

    // Batches are not transactional; whatever was inserted before a failure stays.
    async fn store(&self, drawn: Vec<PrizePool>) -> Result<usize, PoolError> {
        let mut inserted = 0;
        for pool in &drawn {
            self.pools.insert_pool(pool).await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn refresh_featured(&self, snapshot: &CatalogSnapshot) {
        let Some(cache) = &self.cache else {
            return;
        };
        let featured = FeaturedPrizes::from_snapshot(snapshot);
        if let Err(e) = cache.set_featured(&featured, self.cache_ttl_seconds).await {
            warn!("Failed to cache featured prizes for event {}: {}", snapshot.event_id, e);
        }
    }
}

/// Thresholds the monitor works against
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub pools_per_batch: usize,
    pub low_water_mark: usize,
    pub target_available: usize,
    pub quantity_sizes: Vec<u8>,
}

/// Keeps enough AVAILABLE pools per (event, size) for buyers to draw from.
pub struct PoolHealthMonitor {
    pools: Arc<dyn PoolRepository>,
    regenerator: Arc<PoolRegenerator>,
    queue: ReplenishQueue,
    settings: MonitorSettings,
}

impl PoolHealthMonitor {
    pub fn new(
        pools: Arc<dyn PoolRepository>,
        regenerator: Arc<PoolRegenerator>,
        queue: ReplenishQueue,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            pools,
            regenerator,
            queue,
            settings,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Called right before fulfilling a confirmed payment. Regenerates inline
    /// when the key is empty; a low but non-empty key is topped up in the background.
    pub async fn ensure_available(&self, event_id: Uuid, quantity_size: u8) -> Result<usize, PoolError> {
        let available = self.pools.count_available(event_id, quantity_size).await?;

        if available == 0 {
            warn!(
                "No pools left for event {} size {}, regenerating inline",
                event_id, quantity_size
            );
            self.regenerator
                .regenerate(event_id, quantity_size, self.settings.pools_per_batch)
                .await?;

            let available = self.pools.count_available(event_id, quantity_size).await?;
            if available == 0 {
                return Err(PoolError::Exhausted { event_id, quantity_size });
            }
            return Ok(available);
        }

        if available < self.settings.low_water_mark {
            self.queue.enqueue(ReplenishJob::Shortfall {
                event_id,
                quantity_size,
                target: self.settings.target_available,
            });
        }

        Ok(available)
    }

    /// After a successful claim. Never blocks, never fails the caller.
    pub fn replenish_one(&self, event_id: Uuid, quantity_size: u8) {
        self.queue.enqueue(ReplenishJob::TopUp {
            event_id,
            quantity_size,
            target: self.settings.target_available,
        });
    }

    /// After any catalog edit: every AVAILABLE pool of the event goes STALE now,
    /// fresh batches follow in the background.
    pub async fn invalidate(&self, event_id: Uuid) -> Result<u64, PoolError> {
        let retired = self.pools.mark_stale(event_id, None).await?;
        info!("Invalidated {} pools for event {}", retired, event_id);

        for &quantity_size in &self.settings.quantity_sizes {
            self.queue.enqueue(ReplenishJob::Regenerate {
                event_id,
                quantity_size,
                count: self.settings.pools_per_batch,
            });
        }

        Ok(retired)
    }

    /// Redraw a key inline, e.g. after its pools turned out to reference sold items.
    pub async fn regenerate_now(&self, event_id: Uuid, quantity_size: u8) -> Result<usize, PoolError> {
        self.regenerator
            .regenerate(event_id, quantity_size, self.settings.pools_per_batch)
            .await
    }

    pub async fn event_exists(&self, event_id: Uuid) -> Result<bool, PoolError> {
        self.regenerator.event_exists(event_id).await
    }

    pub async fn available(&self, event_id: Uuid, quantity_size: u8) -> Result<usize, PoolError> {
        Ok(self.pools.count_available(event_id, quantity_size).await?)
    }
}
