use async_trait::async_trait;
use uuid::Uuid;
use prizedraw_catalog::{CatalogSnapshot, InventoryItem};
use prizedraw_shared::PrizePool;

use crate::purchase::Purchase;

pub type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Read access to the authoritative inventory
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// `None` means the event has no catalog at all, which is a data-integrity bug upstream.
    async fn snapshot(&self, event_id: Uuid) -> RepoResult<Option<CatalogSnapshot>>;
}

/// Administrative inventory edits. Callers must invalidate the event's pools afterwards.
#[async_trait]
pub trait CatalogAdmin: Send + Sync {
    async fn upsert_item(&self, item: &InventoryItem) -> RepoResult<()>;

    /// Returns `false` when no such item exists for the event.
    async fn delete_item(&self, event_id: Uuid, item_id: Uuid) -> RepoResult<bool>;
}

/// Result of the AVAILABLE -> CLAIMED compare-and-swap
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed(PrizePool),
    AlreadyClaimed,
}

/// Durable collection of generated pools
#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn insert_pool(&self, pool: &PrizePool) -> RepoResult<()>;

    async fn get_pool(&self, id: Uuid) -> RepoResult<Option<PrizePool>>;

    async fn count_available(&self, event_id: Uuid, quantity_size: u8) -> RepoResult<usize>;

    /// Uniformly random AVAILABLE pool for the key, `None` when there is no inventory.
    async fn pick_available(&self, event_id: Uuid, quantity_size: u8) -> RepoResult<Option<PrizePool>>;

    /// AVAILABLE -> STALE for one size, or for every size when `quantity_size` is `None`.
    async fn mark_stale(&self, event_id: Uuid, quantity_size: Option<u8>) -> RepoResult<u64>;

    /// Single conditional update; never read-then-write.
    async fn claim(&self, pool_id: Uuid, buyer_id: &str) -> RepoResult<ClaimOutcome>;
}

/// Result of the payment-completion unit of work
#[derive(Debug, Clone)]
pub enum FulfilmentOutcome {
    Fulfilled(PrizePool),
    AlreadyClaimed,
    /// A catalog row backing the pool could no longer be marked sold; nothing was written.
    SupplyConflict { item_id: Uuid },
    /// The payment reference already has a purchase; nothing was written.
    DuplicatePayment,
}

/// Claim, mark-sold and purchase persistence sharing one transaction
#[async_trait]
pub trait FulfilmentStore: Send + Sync {
    async fn find_purchase(&self, payment_reference: &str) -> RepoResult<Option<Purchase>>;

    async fn claim_and_fulfil(&self, pool_id: Uuid, purchase: &Purchase) -> RepoResult<FulfilmentOutcome>;

    async fn record_manual_fulfilment(&self, purchase: &Purchase) -> RepoResult<()>;
}
