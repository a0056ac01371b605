use std::sync::Arc;
use prometheus::Registry;
use prizedraw_catalog::PricingEngine;
use prizedraw_claim::PurchaseOrchestrator;
use prizedraw_core::repository::{CatalogAdmin, CatalogProvider, FulfilmentStore, PoolRepository};
use prizedraw_pool::{
    MonitorSettings, PoolGenerator, PoolHealthMonitor, PoolRegenerator, ReplenishMetrics, ReplenishQueue,
    ReplenishWorker,
};
use prizedraw_store::app_config::PrizeRules;
use prizedraw_store::{
    DbClient, InMemoryStore, PostgresCatalogRepository, PostgresFulfilmentStore, PostgresPoolRepository,
    RedisClient,
};

/// The four repository seams, backed by one storage engine
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogProvider>,
    pub catalog_admin: Arc<dyn CatalogAdmin>,
    pub pools: Arc<dyn PoolRepository>,
    pub fulfilment: Arc<dyn FulfilmentStore>,
}

impl Backends {
    pub fn postgres(db: &DbClient) -> Self {
        let catalog = Arc::new(PostgresCatalogRepository::new(db.pool.clone()));
        Self {
            catalog: catalog.clone(),
            catalog_admin: catalog,
            pools: Arc::new(PostgresPoolRepository::new(db.pool.clone())),
            fulfilment: Arc::new(PostgresFulfilmentStore::new(db.pool.clone())),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            catalog_admin: store.clone(),
            pools: store.clone(),
            fulfilment: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogProvider>,
    pub catalog_admin: Arc<dyn CatalogAdmin>,
    pub monitor: Arc<PoolHealthMonitor>,
    pub orchestrator: Arc<PurchaseOrchestrator>,
    pub pricing: Arc<PricingEngine>,
    pub prize_rules: PrizeRules,
    pub redis: Option<Arc<RedisClient>>,
    pub registry: Registry,
}

impl AppState {
    /// Wire every service from configuration. The returned worker must be spawned
    /// for background replenishment to happen.
    pub fn assemble(
        backends: Backends,
        prize_rules: PrizeRules,
        redis: Option<Arc<RedisClient>>,
        registry: Registry,
    ) -> anyhow::Result<(Self, ReplenishWorker)> {
        let pricing_config = prize_rules.pricing_config();

        let mut regenerator = PoolRegenerator::new(
            backends.catalog.clone(),
            backends.pools.clone(),
            PoolGenerator::new(pricing_config.clone()),
        );
        if let Some(cache) = &redis {
            regenerator = regenerator.with_featured_cache(cache.clone(), prize_rules.price_cache_ttl_seconds);
        }
        let regenerator = Arc::new(regenerator);

        let metrics = ReplenishMetrics::new(&registry)?;
        let (queue, rx) = ReplenishQueue::new(prize_rules.replenish_queue_capacity, metrics.clone());
        let worker = ReplenishWorker::new(rx, regenerator.clone(), metrics);

        let monitor = Arc::new(PoolHealthMonitor::new(
            backends.pools.clone(),
            regenerator,
            queue,
            MonitorSettings {
                pools_per_batch: prize_rules.pools_per_batch,
                low_water_mark: prize_rules.low_water_mark,
                target_available: prize_rules.target_available,
                quantity_sizes: prize_rules.quantity_sizes.clone(),
            },
        ));

        let orchestrator = Arc::new(PurchaseOrchestrator::new(
            backends.pools.clone(),
            backends.fulfilment.clone(),
            monitor.clone(),
            prize_rules.quantity_sizes.clone(),
        ));

        let state = Self {
            catalog: backends.catalog,
            catalog_admin: backends.catalog_admin,
            monitor,
            orchestrator,
            pricing: Arc::new(PricingEngine::new(pricing_config)),
            prize_rules,
            redis,
            registry,
        };

        Ok((state, worker))
    }
}
