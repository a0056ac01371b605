use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use prizedraw_catalog::{CatalogSnapshot, InventoryItem, PricingConfig, PricingEngine};
use prizedraw_shared::{Bundle, PrizePool};

/// Draws randomized prize pools from a catalog snapshot.
///
/// Drawing never reserves inventory: the same physical ticket may back more than
/// one pool in a batch, and only the sale-time conditional update decides who gets it.
pub struct PoolGenerator {
    pricing: PricingEngine,
}

impl PoolGenerator {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            pricing: PricingEngine::new(config),
        }
    }

    /// One independent draw. `None` when supply cannot fill `quantity_size` units.
    pub fn draw_pool<R: Rng + ?Sized>(
        &self,
        snapshot: &CatalogSnapshot,
        quantity_size: u8,
        rng: &mut R,
    ) -> Option<PrizePool> {
        let size = usize::from(quantity_size);
        if size == 0 {
            return None;
        }

        let mut tickets = flat_entries(snapshot.ticket_like(), |item| {
            eligible(item, quantity_size) && item.sellable_quantity() >= i32::from(quantity_size)
        });
        let mut collectibles = flat_entries(snapshot.collectibles(), |item| eligible(item, quantity_size));

        if tickets.len() < size || collectibles.len() < size {
            debug!(
                "Event {} size {}: {} ticket entries, {} collectible entries, not enough to draw",
                snapshot.event_id,
                quantity_size,
                tickets.len(),
                collectibles.len()
            );
            return None;
        }

        // Fisher–Yates, each flat pool independently
        tickets.shuffle(rng);
        collectibles.shuffle(rng);

        // Units share one ticket so multi-unit buyers sit together.
        let ticket = tickets[0].to_prize_ref();
        let chosen = distinct_collectibles(&collectibles, size)?;

        let bundles: Vec<Bundle> = chosen
            .into_iter()
            .map(|collectible| Bundle::new(ticket.clone(), collectible.to_prize_ref()))
            .collect();

        let total_value: i64 = bundles.iter().map(Bundle::value_cents).sum();
        let per_unit = total_value as f64 / size as f64;
        let total_price = self.pricing.apply_margin(per_unit * size as f64);

        Some(PrizePool::new(snapshot.event_id, quantity_size, bundles, total_value, total_price))
    }

    /// Up to `count` independent draws; stops early once supply runs dry.
    pub fn draw_batch<R: Rng + ?Sized>(
        &self,
        snapshot: &CatalogSnapshot,
        quantity_size: u8,
        count: usize,
        rng: &mut R,
    ) -> Vec<PrizePool> {
        let mut pools = Vec::with_capacity(count);
        for _ in 0..count {
            match self.draw_pool(snapshot, quantity_size, rng) {
                Some(pool) => pools.push(pool),
                None => break,
            }
        }
        pools
    }
}

fn eligible(item: &InventoryItem, quantity_size: u8) -> bool {
    item.is_primary() && item.eligible_for_size(quantity_size) && item.is_available()
}

/// One entry per sellable unit, so stock levels weight the draw.
fn flat_entries<'a>(
    items: impl Iterator<Item = &'a InventoryItem>,
    admit: impl Fn(&InventoryItem) -> bool,
) -> Vec<&'a InventoryItem> {
    items
        .filter(|item| admit(item))
        .flat_map(|item| std::iter::repeat(item).take(item.sellable_quantity() as usize))
        .collect()
}

/// First `size` distinct identities in shuffled order, or `None` if there are fewer.
fn distinct_collectibles<'a>(shuffled: &[&'a InventoryItem], size: usize) -> Option<Vec<&'a InventoryItem>> {
    let mut seen = HashSet::new();
    let chosen: Vec<&InventoryItem> = shuffled
        .iter()
        .copied()
        .filter(|item| seen.insert(item.id()))
        .take(size)
        .collect();

    (chosen.len() == size).then_some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prizedraw_catalog::PricingMode;
    use prizedraw_shared::Tier;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn generator() -> PoolGenerator {
        PoolGenerator::new(PricingConfig {
            margin_percentage: 30.0,
            mode: PricingMode::TicketOnly,
        })
    }

    fn scenario_a(event_id: Uuid) -> CatalogSnapshot {
        let mut items = Vec::new();
        for (name, price) in [("Upper", 100), ("Mezzanine", 150), ("Lower", 200)] {
            items.push(InventoryItem::ticket_level(event_id, name, price, 5));
        }
        for (name, price) in [("Pin", 20), ("Scarf", 30), ("Cap", 40), ("Jersey", 50)] {
            items.push(InventoryItem::collectible(event_id, name, price, 1));
        }
        CatalogSnapshot::new(event_id, items)
    }

    #[test]
    fn test_pair_shares_ticket_and_distinct_collectibles() {
        let event_id = Uuid::new_v4();
        let snapshot = scenario_a(event_id);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let pool = generator().draw_pool(&snapshot, 2, &mut rng).unwrap();
            assert_eq!(pool.bundles.len(), 2);

            let ticket = &pool.bundles[0].ticket;
            assert!(pool.bundles.iter().all(|b| b.ticket.item_id == ticket.item_id));
            assert!([100, 150, 200].contains(&ticket.value_cents));

            let first = &pool.bundles[0].collectible;
            let second = &pool.bundles[1].collectible;
            assert_ne!(first.item_id, second.item_id);
            assert!([20, 30, 40, 50].contains(&first.value_cents));
            assert!([20, 30, 40, 50].contains(&second.value_cents));

            let expected_value = 2 * ticket.value_cents + first.value_cents + second.value_cents;
            assert_eq!(pool.total_value_cents, expected_value);
            assert_eq!(pool.total_price_cents, (expected_value as f64 * 1.3).round() as i64);
            assert!(pool.is_available());
        }
    }

    fn chi_squared(counts: &HashMap<Uuid, usize>, expected: &HashMap<Uuid, f64>) -> f64 {
        expected
            .iter()
            .map(|(id, &e)| {
                let observed = counts.get(id).copied().unwrap_or(0) as f64;
                (observed - e).powi(2) / e
            })
            .sum()
    }

    #[test]
    fn test_ticket_draw_weighted_by_stock() {
        let event_id = Uuid::new_v4();
        let levels = [
            InventoryItem::ticket_level(event_id, "Upper", 100, 1),
            InventoryItem::ticket_level(event_id, "Mezzanine", 150, 2),
            InventoryItem::ticket_level(event_id, "Lower", 200, 3),
        ];
        let mut items = levels.to_vec();
        items.push(InventoryItem::collectible(event_id, "Pin", 20, 1));
        let snapshot = CatalogSnapshot::new(event_id, items);
        let mut rng = StdRng::seed_from_u64(21);

        let trials = 60_000;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for _ in 0..trials {
            let pool = generator().draw_pool(&snapshot, 1, &mut rng).unwrap();
            *counts.entry(pool.bundles[0].ticket.item_id).or_default() += 1;
        }

        let expected: HashMap<Uuid, f64> = levels
            .iter()
            .map(|l| (l.id(), trials as f64 * f64::from(l.sellable_quantity()) / 6.0))
            .collect();
        // 2 degrees of freedom; 13.8 is the 0.999 quantile
        assert!(chi_squared(&counts, &expected) < 13.8, "{:?}", counts);
    }

    #[test]
    fn test_collectible_orderings_equally_likely() {
        let event_id = Uuid::new_v4();
        let snapshot = CatalogSnapshot::new(event_id, vec![
            InventoryItem::ticket_level(event_id, "Lower", 200, 10),
            InventoryItem::collectible(event_id, "Pin", 20, 1),
            InventoryItem::collectible(event_id, "Scarf", 30, 1),
            InventoryItem::collectible(event_id, "Cap", 40, 1),
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        let trials = 60_000;
        let mut seen: HashMap<(Uuid, Uuid), usize> = HashMap::new();
        for _ in 0..trials {
            let pool = generator().draw_pool(&snapshot, 2, &mut rng).unwrap();
            let order = (pool.bundles[0].collectible.item_id, pool.bundles[1].collectible.item_id);
            *seen.entry(order).or_default() += 1;
        }

        // every ordered pair of the three collectibles
        assert_eq!(seen.len(), 6);
        let expected = trials as f64 / 6.0;
        let statistic: f64 = seen
            .values()
            .map(|&observed| (observed as f64 - expected).powi(2) / expected)
            .sum();
        // 5 degrees of freedom; 20.5 is the 0.999 quantile
        assert!(statistic < 20.5, "chi-squared {} too large: {:?}", statistic, seen);
    }

    #[test]
    fn test_too_few_distinct_collectibles_aborts() {
        let event_id = Uuid::new_v4();
        let snapshot = CatalogSnapshot::new(event_id, vec![
            InventoryItem::ticket_level(event_id, "Lower", 200, 10),
            // plenty of units, but only one identity
            InventoryItem::collectible(event_id, "Pin", 20, 10),
        ]);
        let mut rng = StdRng::seed_from_u64(3);

        assert!(generator().draw_pool(&snapshot, 3, &mut rng).is_none());
        assert!(generator().draw_batch(&snapshot, 3, 5, &mut rng).is_empty());
        assert!(generator().draw_pool(&snapshot, 1, &mut rng).is_some());
    }

    #[test]
    fn test_backups_and_ineligible_items_never_drawn() {
        let event_id = Uuid::new_v4();
        let primary = InventoryItem::ticket_level(event_id, "Lower", 200, 4);
        let snapshot = CatalogSnapshot::new(event_id, vec![
            primary.clone(),
            InventoryItem::special_prize(event_id, "Backup Suite", 90000, 5).with_tier(Tier::Vip, 2),
            InventoryItem::ticket_level(event_id, "Singles Only", 50, 9).with_sizes(&[1]),
            InventoryItem::seat(event_id, "104", "F", "12", 15000),
            InventoryItem::collectible(event_id, "Pin", 20, 3),
            InventoryItem::collectible(event_id, "Cap", 40, 3),
        ]);
        let mut rng = StdRng::seed_from_u64(11);

        // a single seat cannot back two units, so only "Lower" qualifies at size 2
        for pool in generator().draw_batch(&snapshot, 2, 50, &mut rng) {
            assert_eq!(pool.bundles[0].ticket.item_id, primary.id());
        }
    }

    #[test]
    fn test_single_unit_pool() {
        let event_id = Uuid::new_v4();
        let seat = InventoryItem::seat(event_id, "104", "F", "12", 15000);
        let pin = InventoryItem::collectible(event_id, "Pin", 500, 1);
        let snapshot = CatalogSnapshot::new(event_id, vec![seat.clone(), pin.clone()]);
        let mut rng = StdRng::seed_from_u64(5);

        let pool = generator().draw_pool(&snapshot, 1, &mut rng).unwrap();
        assert_eq!(pool.bundles.len(), 1);
        assert_eq!(pool.bundles[0].ticket.item_id, seat.id());
        assert_eq!(pool.bundles[0].collectible.item_id, pin.id());
        assert_eq!(pool.total_value_cents, 15500);
        assert_eq!(pool.total_price_cents, 20150);
    }

    #[test]
    fn test_batch_may_reuse_a_ticket() {
        let event_id = Uuid::new_v4();
        let snapshot = CatalogSnapshot::new(event_id, vec![
            InventoryItem::seat(event_id, "104", "F", "12", 15000),
            InventoryItem::collectible(event_id, "Pin", 500, 10),
        ]);
        let mut rng = StdRng::seed_from_u64(9);

        let batch = generator().draw_batch(&snapshot, 1, 5, &mut rng);
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|p| p.bundles[0].ticket.item_id == batch[0].bundles[0].ticket.item_id));
    }
}
