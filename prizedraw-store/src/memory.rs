use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;
use prizedraw_catalog::{CatalogSnapshot, InventoryItem, SeatStatus};
use prizedraw_core::repository::{
    CatalogAdmin, CatalogProvider, ClaimOutcome, FulfilmentOutcome, FulfilmentStore, PoolRepository, RepoResult,
};
use prizedraw_core::Purchase;
use prizedraw_shared::{PoolState, PrizePool};

#[derive(Default)]
struct MemoryState {
    events: HashSet<Uuid>,
    items: HashMap<Uuid, InventoryItem>,
    pools: HashMap<Uuid, PrizePool>,
    purchases: HashMap<String, Purchase>,
}

/// Process-local backend for every repository trait. One lock guards all of it,
/// so claim, mark-sold and purchase insertion are atomic with respect to each other.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_event(&self, event_id: Uuid) {
        self.state.lock().await.events.insert(event_id);
    }

    pub async fn seed_event(&self, event_id: Uuid, items: Vec<InventoryItem>) {
        let mut state = self.state.lock().await;
        state.events.insert(event_id);
        for item in items {
            state.items.insert(item.id(), item);
        }
    }

    pub async fn item(&self, item_id: Uuid) -> Option<InventoryItem> {
        self.state.lock().await.items.get(&item_id).cloned()
    }

    pub async fn pools(&self, event_id: Uuid) -> Vec<PrizePool> {
        let state = self.state.lock().await;
        let mut pools: Vec<PrizePool> = state.pools.values().filter(|p| p.event_id == event_id).cloned().collect();
        pools.sort_by_key(|p| p.created_at);
        pools
    }

    pub async fn purchases(&self) -> Vec<Purchase> {
        self.state.lock().await.purchases.values().cloned().collect()
    }
}

fn available_ids(state: &MemoryState, event_id: Uuid, quantity_size: u8) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = state
        .pools
        .values()
        .filter(|p| p.event_id == event_id && p.quantity_size == quantity_size && p.is_available())
        .map(|p| p.id)
        .collect();
    ids.sort();
    ids
}

fn choose_uniform(ids: &[Uuid]) -> Option<Uuid> {
    ids.choose(&mut rand::thread_rng()).copied()
}

fn claim_in(state: &mut MemoryState, pool_id: Uuid, buyer_id: &str) -> Option<PrizePool> {
    let pool = state.pools.get_mut(&pool_id)?;
    if !pool.state.can_transition_to(PoolState::Claimed) {
        return None;
    }
    pool.state = PoolState::Claimed;
    pool.claimed_at = Some(Utc::now());
    pool.claimed_by = Some(buyer_id.to_string());
    Some(pool.clone())
}

/// The first item that cannot supply its units, if any.
fn supply_shortfall(state: &MemoryState, pool: &PrizePool) -> Option<Uuid> {
    pool.units_by_item().into_iter().find_map(|(prize, units)| {
        let enough = match state.items.get(&prize.item_id) {
            Some(InventoryItem::Seat(seat)) => {
                seat.status == SeatStatus::Available && seat.common.remaining_quantity >= units
            }
            Some(item) => item.common().remaining_quantity >= units,
            None => false,
        };
        (!enough).then_some(prize.item_id)
    })
}

fn mark_sold(state: &mut MemoryState, pool: &PrizePool) {
    for (prize, units) in pool.units_by_item() {
        match state.items.get_mut(&prize.item_id) {
            Some(InventoryItem::Seat(seat)) => {
                seat.status = SeatStatus::Sold;
                seat.common.remaining_quantity = 0;
            }
            Some(item) => item.common_mut().remaining_quantity -= units,
            None => {}
        }
    }
}

#[async_trait]
impl CatalogProvider for InMemoryStore {
    async fn snapshot(&self, event_id: Uuid) -> RepoResult<Option<CatalogSnapshot>> {
        let state = self.state.lock().await;
        if !state.events.contains(&event_id) {
            return Ok(None);
        }

        let mut items: Vec<InventoryItem> =
            state.items.values().filter(|i| i.common().event_id == event_id).cloned().collect();
        items.sort_by(|a, b| a.common().name.cmp(&b.common().name).then(a.id().cmp(&b.id())));

        Ok(Some(CatalogSnapshot::new(event_id, items)))
    }
}

#[async_trait]
impl CatalogAdmin for InMemoryStore {
    async fn upsert_item(&self, item: &InventoryItem) -> RepoResult<()> {
        let mut state = self.state.lock().await;
        let event_id = item.common().event_id;
        if !state.events.contains(&event_id) {
            return Err(format!("unknown event {}", event_id).into());
        }
        if let Some(existing) = state.items.get(&item.id()) {
            if existing.common().event_id != event_id {
                return Err(format!("item {} belongs to another event", item.id()).into());
            }
        }
        state.items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn delete_item(&self, event_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        match state.items.get(&item_id) {
            Some(item) if item.common().event_id == event_id => {
                state.items.remove(&item_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PoolRepository for InMemoryStore {
    async fn insert_pool(&self, pool: &PrizePool) -> RepoResult<()> {
        self.state.lock().await.pools.insert(pool.id, pool.clone());
        Ok(())
    }

    async fn get_pool(&self, id: Uuid) -> RepoResult<Option<PrizePool>> {
        Ok(self.state.lock().await.pools.get(&id).cloned())
    }

    async fn count_available(&self, event_id: Uuid, quantity_size: u8) -> RepoResult<usize> {
        let state = self.state.lock().await;
        Ok(available_ids(&state, event_id, quantity_size).len())
    }

    async fn pick_available(&self, event_id: Uuid, quantity_size: u8) -> RepoResult<Option<PrizePool>> {
        let state = self.state.lock().await;
        let picked = choose_uniform(&available_ids(&state, event_id, quantity_size));
        Ok(picked.and_then(|id| state.pools.get(&id).cloned()))
    }

    async fn mark_stale(&self, event_id: Uuid, quantity_size: Option<u8>) -> RepoResult<u64> {
        let mut state = self.state.lock().await;
        let mut marked = 0;
        for pool in state.pools.values_mut() {
            let size_matches = quantity_size.map_or(true, |s| s == pool.quantity_size);
            if pool.event_id == event_id && size_matches && pool.is_available() {
                pool.state = PoolState::Stale;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn claim(&self, pool_id: Uuid, buyer_id: &str) -> RepoResult<ClaimOutcome> {
        let mut state = self.state.lock().await;
        Ok(match claim_in(&mut state, pool_id, buyer_id) {
            Some(pool) => ClaimOutcome::Claimed(pool),
            None => ClaimOutcome::AlreadyClaimed,
        })
    }
}

#[async_trait]
impl FulfilmentStore for InMemoryStore {
    async fn find_purchase(&self, payment_reference: &str) -> RepoResult<Option<Purchase>> {
        Ok(self.state.lock().await.purchases.get(payment_reference).cloned())
    }

    async fn claim_and_fulfil(&self, pool_id: Uuid, purchase: &Purchase) -> RepoResult<FulfilmentOutcome> {
        let mut state = self.state.lock().await;

        if state.purchases.contains_key(&purchase.payment_reference) {
            return Ok(FulfilmentOutcome::DuplicatePayment);
        }

        let available = state.pools.get(&pool_id).is_some_and(PrizePool::is_available);
        if !available {
            return Ok(FulfilmentOutcome::AlreadyClaimed);
        }

        // Check before mutating anything so a conflict leaves no trace.
        if let Some(pool) = state.pools.get(&pool_id) {
            if let Some(item_id) = supply_shortfall(&state, pool) {
                return Ok(FulfilmentOutcome::SupplyConflict { item_id });
            }
        }

        let Some(pool) = claim_in(&mut state, pool_id, &purchase.buyer_id) else {
            return Ok(FulfilmentOutcome::AlreadyClaimed);
        };
        mark_sold(&mut state, &pool);
        state.purchases.insert(purchase.payment_reference.clone(), purchase.clone());

        Ok(FulfilmentOutcome::Fulfilled(pool))
    }

    async fn record_manual_fulfilment(&self, purchase: &Purchase) -> RepoResult<()> {
        self.state
            .lock()
            .await
            .purchases
            .entry(purchase.payment_reference.clone())
            .or_insert_with(|| purchase.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prizedraw_core::{PaymentConfirmation, PaymentStatus, PurchaseStatus};
    use prizedraw_shared::Bundle;
    use std::sync::Arc;

    fn confirmation(event_id: Uuid, reference: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            payment_reference: reference.to_string(),
            event_id,
            quantity_size: 1,
            buyer_id: "buyer-1".to_string(),
            buyer_email: Some("fan@example.com".to_string()),
            amount_cents: 13000,
            status: PaymentStatus::Succeeded,
        }
    }

    async fn seeded() -> (InMemoryStore, Uuid, InventoryItem, InventoryItem, PrizePool) {
        let event_id = Uuid::new_v4();
        let seat = InventoryItem::seat(event_id, "104", "F", "12", 15000);
        let pin = InventoryItem::collectible(event_id, "Pin", 500, 3);
        let store = InMemoryStore::new();
        store.seed_event(event_id, vec![seat.clone(), pin.clone()]).await;

        let bundle = Bundle::new(seat.to_prize_ref(), pin.to_prize_ref());
        let pool = PrizePool::new(event_id, 1, vec![bundle], 15500, 20150);
        store.insert_pool(&pool).await.unwrap();
        (store, event_id, seat, pin, pool)
    }

    #[tokio::test]
    async fn test_unknown_event_has_no_snapshot() {
        let store = InMemoryStore::new();
        assert!(store.snapshot(Uuid::new_v4()).await.unwrap().is_none());

        let event_id = Uuid::new_v4();
        store.add_event(event_id).await;
        let snapshot = store.snapshot(event_id).await.unwrap().unwrap();
        assert!(snapshot.items.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let (store, _, _, _, pool) = seeded().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let pool_id = pool.id;
            handles.push(tokio::spawn(async move { store.claim(pool_id, &format!("buyer-{}", i)).await.unwrap() }));
        }

        let mut winners = 0;
        for handle in handles {
            if let ClaimOutcome::Claimed(_) = handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.get_pool(pool.id).await.unwrap().unwrap().state, PoolState::Claimed);
    }

    #[tokio::test]
    async fn test_fulfilment_marks_items_sold() {
        let (store, event_id, seat, pin, pool) = seeded().await;
        let purchase = Purchase::for_pool(&confirmation(event_id, "pi_1"), pool.id);

        let outcome = store.claim_and_fulfil(pool.id, &purchase).await.unwrap();
        assert!(matches!(outcome, FulfilmentOutcome::Fulfilled(_)));

        match store.item(seat.id()).await.unwrap() {
            InventoryItem::Seat(s) => assert_eq!(s.status, SeatStatus::Sold),
            other => panic!("expected seat, got {:?}", other),
        }
        assert_eq!(store.item(pin.id()).await.unwrap().common().remaining_quantity, 2);

        let stored = store.find_purchase("pi_1").await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Fulfilled);
        assert_eq!(stored.pool_id, Some(pool.id));

        let again = store.claim_and_fulfil(pool.id, &purchase).await.unwrap();
        assert!(matches!(again, FulfilmentOutcome::DuplicatePayment));
    }

    #[tokio::test]
    async fn test_supply_conflict_leaves_state_untouched() {
        let (store, event_id, seat, pin, pool) = seeded().await;

        let mut sold = seat.clone();
        if let InventoryItem::Seat(s) = &mut sold {
            s.status = SeatStatus::Sold;
        }
        store.upsert_item(&sold).await.unwrap();

        let purchase = Purchase::for_pool(&confirmation(event_id, "pi_2"), pool.id);
        let outcome = store.claim_and_fulfil(pool.id, &purchase).await.unwrap();
        assert!(matches!(outcome, FulfilmentOutcome::SupplyConflict { item_id } if item_id == seat.id()));

        assert!(store.get_pool(pool.id).await.unwrap().unwrap().is_available());
        assert_eq!(store.item(pin.id()).await.unwrap().common().remaining_quantity, 3);
        assert!(store.find_purchase("pi_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_stale_by_size() {
        let (store, event_id, seat, pin, _) = seeded().await;
        let bundle = Bundle::new(seat.to_prize_ref(), pin.to_prize_ref());
        let bigger = PrizePool::new(event_id, 2, vec![bundle.clone(), bundle], 31000, 40300);
        store.insert_pool(&bigger).await.unwrap();

        assert_eq!(store.mark_stale(event_id, Some(2)).await.unwrap(), 1);
        assert_eq!(store.count_available(event_id, 1).await.unwrap(), 1);
        assert_eq!(store.count_available(event_id, 2).await.unwrap(), 0);

        assert_eq!(store.mark_stale(event_id, None).await.unwrap(), 1);
        assert!(store.pick_available(event_id, 1).await.unwrap().is_none());
    }
}
