use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use prizedraw_shared::PrizeRef;

use crate::inventory::{CatalogSnapshot, InventoryItem};

/// Highest-value prizes currently up for grabs, for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedPrizes {
    pub event_id: Uuid,
    pub top_ticket: Option<PrizeRef>,
    pub top_collectible: Option<PrizeRef>,
    pub computed_at: DateTime<Utc>,
}

impl FeaturedPrizes {
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        Self {
            event_id: snapshot.event_id,
            top_ticket: most_valuable(snapshot.ticket_like()),
            top_collectible: most_valuable(snapshot.collectibles()),
            computed_at: Utc::now(),
        }
    }
}

fn most_valuable<'a>(items: impl Iterator<Item = &'a InventoryItem>) -> Option<PrizeRef> {
    items
        .filter(|i| i.is_available() && i.is_primary())
        .max_by_key(|i| i.common().price_cents)
        .map(InventoryItem::to_prize_ref)
}
