use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::inventory::{CatalogSnapshot, InventoryItem};

/// Which sides of a bundle contribute to its value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Bundle value is the ticket-side average only
    #[default]
    TicketOnly,
    /// Legacy two-sided value: ticket average plus collectible average
    TicketAndCollectible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Markup applied on top of bundle value, in percent
    pub margin_percentage: f64,
    pub mode: PricingMode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            margin_percentage: 30.0,
            mode: PricingMode::TicketOnly,
        }
    }
}

/// Optional narrowing of the catalog before pricing
#[derive(Debug, Clone, Default)]
pub struct PriceFilter {
    pub pack: Option<String>,
    pub quantity_size: Option<u8>,
}

impl PriceFilter {
    pub fn cell(pack: &str, quantity_size: u8) -> Self {
        Self {
            pack: Some(pack.to_string()),
            quantity_size: Some(quantity_size),
        }
    }

    fn admits(&self, item: &InventoryItem) -> bool {
        if !item.is_available() || !item.is_primary() {
            return false;
        }
        if let Some(pack) = &self.pack {
            if !item.eligible_for_pack(pack) {
                return false;
            }
        }
        if let Some(size) = self.quantity_size {
            if !item.eligible_for_size(size) || item.sellable_quantity() < i32::from(size) {
                return false;
            }
        }
        true
    }
}

/// Display price for one (pack, quantity size) combination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub pack: Option<String>,
    pub quantity_size: u8,
    pub items_available: i64,
    pub average_ticket_cents: i64,
    pub average_collectible_cents: i64,
    pub total_value_cents: i64,
    pub sale_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceMatrix {
    pub event_id: Uuid,
    pub margin_percentage: f64,
    pub mode: PricingMode,
    pub cells: Vec<PriceQuote>,
    pub computed_at: DateTime<Utc>,
}

impl PriceMatrix {
    pub fn cell(&self, pack: &str, quantity_size: u8) -> Option<&PriceQuote> {
        self.cells.iter().find(|c| {
            c.quantity_size == quantity_size
                && c.pack.as_deref().map(|p| p.eq_ignore_ascii_case(pack)).unwrap_or(false)
        })
    }
}

/// Prices bundles from live, unsold supply
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Sale price for a value, rounded to the nearest cent
    pub fn apply_margin(&self, value_cents: f64) -> i64 {
        (value_cents * (1.0 + self.config.margin_percentage / 100.0)).round() as i64
    }

    /// Price one filtered view of the catalog. Never fails: an empty view prices at zero.
    pub fn quote(&self, snapshot: &CatalogSnapshot, filter: &PriceFilter) -> PriceQuote {
        let eligible: Vec<&InventoryItem> = snapshot.items.iter().filter(|i| filter.admits(i)).collect();

        let levels: Vec<&InventoryItem> = eligible.iter().copied()
            .filter(|i| matches!(i, InventoryItem::TicketLevel(_)))
            .collect();
        let specials: Vec<&InventoryItem> = eligible.iter().copied()
            .filter(|i| matches!(i, InventoryItem::SpecialPrize(_)))
            .collect();

        // Tiered levels, when present, carry the price signal on their own; specials
        // still count toward what is available.
        let (ticket_average, items_available) = if !levels.is_empty() {
            let (average, level_units) = weighted_average(&levels);
            let (_, special_units) = weighted_average(&specials);
            (average, level_units + special_units)
        } else {
            let seats_and_specials: Vec<&InventoryItem> = eligible.iter().copied()
                .filter(|i| matches!(i, InventoryItem::Seat(_) | InventoryItem::SpecialPrize(_)))
                .collect();
            weighted_average(&seats_and_specials)
        };

        let collectibles: Vec<&InventoryItem> = eligible.iter().copied()
            .filter(|i| !i.is_ticket_like())
            .collect();
        let (collectible_average, _) = weighted_average(&collectibles);

        let quantity_size = filter.quantity_size.unwrap_or(1);
        let per_unit = match self.config.mode {
            PricingMode::TicketOnly => ticket_average,
            PricingMode::TicketAndCollectible => ticket_average + collectible_average,
        };
        let total_value = per_unit * f64::from(quantity_size);

        PriceQuote {
            pack: filter.pack.clone(),
            quantity_size,
            items_available,
            average_ticket_cents: ticket_average.round() as i64,
            average_collectible_cents: collectible_average.round() as i64,
            total_value_cents: total_value.round() as i64,
            sale_price_cents: self.apply_margin(total_value),
        }
    }

    /// Price every pack x quantity size cell independently.
    pub fn matrix(&self, snapshot: &CatalogSnapshot, packs: &[String], sizes: &[u8]) -> PriceMatrix {
        let mut cells = Vec::with_capacity(packs.len() * sizes.len());
        for pack in packs {
            for &size in sizes {
                cells.push(self.quote(snapshot, &PriceFilter::cell(pack, size)));
            }
        }

        PriceMatrix {
            event_id: snapshot.event_id,
            margin_percentage: self.config.margin_percentage,
            mode: self.config.mode,
            cells,
            computed_at: Utc::now(),
        }
    }
}

/// Quantity-weighted mean price and the number of units behind it.
fn weighted_average(items: &[&InventoryItem]) -> (f64, i64) {
    let mut units: i64 = 0;
    let mut value: f64 = 0.0;
    for item in items {
        let quantity = i64::from(item.sellable_quantity());
        units += quantity;
        value += item.common().price_cents as f64 * quantity as f64;
    }

    if units == 0 {
        (0.0, 0)
    } else {
        (value / units as f64, units)
    }
}
