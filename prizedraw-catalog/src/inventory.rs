use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use prizedraw_shared::{PrizeKind, PrizeRef, Tier};

use crate::{DEFAULT_PACKS, DEFAULT_QUANTITY_SIZES, MAX_ITEM_QUANTITY};

/// Sale status of an individually seated ticket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Sold,
    Reserved,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Sold => "SOLD",
            SeatStatus::Reserved => "RESERVED",
        }
    }
}

impl std::str::FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SeatStatus::Available),
            "SOLD" => Ok(SeatStatus::Sold),
            "RESERVED" => Ok(SeatStatus::Reserved),
            other => Err(format!("unknown seat status: {}", other)),
        }
    }
}

/// Fields every inventory kind carries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemCommon {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub remaining_quantity: i32,
    pub tier: Tier,
    /// 1 = primary; anything higher is a backup and never enters a pool
    pub tier_priority: i32,
    pub eligible_sizes: Vec<u8>,
    pub eligible_packs: Vec<String>,
}

impl ItemCommon {
    fn new(event_id: Uuid, name: &str, price_cents: i64, remaining_quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            name: name.to_string(),
            price_cents,
            remaining_quantity,
            tier: Tier::Standard,
            tier_priority: 1,
            eligible_sizes: DEFAULT_QUANTITY_SIZES.to_vec(),
            eligible_packs: DEFAULT_PACKS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketLevel {
    pub common: ItemCommon,
    pub level_name: String,
    pub section: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatTicket {
    pub common: ItemCommon,
    pub section: String,
    pub row: String,
    pub seat_number: String,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialPrize {
    pub common: ItemCommon,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collectible {
    pub common: ItemCommon,
    pub category: Option<String>,
    pub signed_by: Option<String>,
}

/// A sellable catalog row. The first three kinds are ticket-like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryItem {
    TicketLevel(TicketLevel),
    Seat(SeatTicket),
    SpecialPrize(SpecialPrize),
    Collectible(Collectible),
}

impl InventoryItem {
    pub fn ticket_level(event_id: Uuid, level_name: &str, price_cents: i64, quantity: i32) -> Self {
        InventoryItem::TicketLevel(TicketLevel {
            common: ItemCommon::new(event_id, level_name, price_cents, quantity),
            level_name: level_name.to_string(),
            section: None,
        })
    }

    pub fn seat(event_id: Uuid, section: &str, row: &str, seat_number: &str, price_cents: i64) -> Self {
        let name = format!("Section {}, Row {}, Seat {}", section, row, seat_number);
        InventoryItem::Seat(SeatTicket {
            common: ItemCommon::new(event_id, &name, price_cents, 1),
            section: section.to_string(),
            row: row.to_string(),
            seat_number: seat_number.to_string(),
            status: SeatStatus::Available,
        })
    }

    pub fn special_prize(event_id: Uuid, name: &str, price_cents: i64, quantity: i32) -> Self {
        InventoryItem::SpecialPrize(SpecialPrize {
            common: ItemCommon::new(event_id, name, price_cents, quantity),
            description: None,
        })
    }

    pub fn collectible(event_id: Uuid, name: &str, price_cents: i64, quantity: i32) -> Self {
        InventoryItem::Collectible(Collectible {
            common: ItemCommon::new(event_id, name, price_cents, quantity),
            category: None,
            signed_by: None,
        })
    }

    pub fn with_sizes(mut self, sizes: &[u8]) -> Self {
        self.common_mut().eligible_sizes = sizes.to_vec();
        self
    }

    pub fn with_packs(mut self, packs: &[&str]) -> Self {
        self.common_mut().eligible_packs = packs.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_tier(mut self, tier: Tier, priority: i32) -> Self {
        let common = self.common_mut();
        common.tier = tier;
        common.tier_priority = priority;
        self
    }

    pub fn common(&self) -> &ItemCommon {
        match self {
            InventoryItem::TicketLevel(t) => &t.common,
            InventoryItem::Seat(s) => &s.common,
            InventoryItem::SpecialPrize(p) => &p.common,
            InventoryItem::Collectible(c) => &c.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ItemCommon {
        match self {
            InventoryItem::TicketLevel(t) => &mut t.common,
            InventoryItem::Seat(s) => &mut s.common,
            InventoryItem::SpecialPrize(p) => &mut p.common,
            InventoryItem::Collectible(c) => &mut c.common,
        }
    }

    pub fn id(&self) -> Uuid {
        self.common().id
    }

    pub fn kind(&self) -> PrizeKind {
        match self {
            InventoryItem::TicketLevel(_) => PrizeKind::TicketLevel,
            InventoryItem::Seat(_) => PrizeKind::Seat,
            InventoryItem::SpecialPrize(_) => PrizeKind::SpecialPrize,
            InventoryItem::Collectible(_) => PrizeKind::Collectible,
        }
    }

    pub fn is_ticket_like(&self) -> bool {
        self.kind().is_ticket_like()
    }

    /// Units that can still be sold. Seats that are sold or reserved count as zero.
    pub fn sellable_quantity(&self) -> i32 {
        let remaining = self.common().remaining_quantity.max(0);
        match self {
            InventoryItem::Seat(s) if s.status != SeatStatus::Available => 0,
            _ => remaining,
        }
    }

    pub fn is_available(&self) -> bool {
        self.sellable_quantity() > 0
    }

    pub fn is_primary(&self) -> bool {
        self.common().tier_priority == 1
    }

    pub fn eligible_for_size(&self, quantity_size: u8) -> bool {
        self.common().eligible_sizes.contains(&quantity_size)
    }

    pub fn eligible_for_pack(&self, pack: &str) -> bool {
        self.common().eligible_packs.iter().any(|p| p.eq_ignore_ascii_case(pack))
    }

    pub fn to_prize_ref(&self) -> PrizeRef {
        let common = self.common();
        let detail = match self {
            InventoryItem::TicketLevel(t) => t.section.clone().or_else(|| Some(t.level_name.clone())),
            InventoryItem::Seat(s) => Some(format!("Section {}, Row {}, Seat {}", s.section, s.row, s.seat_number)),
            InventoryItem::SpecialPrize(p) => p.description.clone(),
            InventoryItem::Collectible(c) => match (&c.category, &c.signed_by) {
                (Some(category), Some(signer)) => Some(format!("{} signed by {}", category, signer)),
                (Some(category), None) => Some(category.clone()),
                (None, Some(signer)) => Some(format!("Signed by {}", signer)),
                (None, None) => None,
            },
        };

        PrizeRef {
            item_id: common.id,
            kind: self.kind(),
            name: common.name.clone(),
            value_cents: common.price_cents,
            tier: common.tier,
            detail,
        }
    }

    /// Reject rows that would corrupt pricing or pool generation.
    pub fn validate(&self, event_id: Uuid) -> Result<(), CatalogError> {
        let common = self.common();
        if common.event_id != event_id {
            return Err(CatalogError::InvalidItem(format!(
                "item {} belongs to event {}, not {}",
                common.id, common.event_id, event_id
            )));
        }
        if common.price_cents < 0 {
            return Err(CatalogError::InvalidItem(format!("item {} has a negative price", common.id)));
        }
        if common.remaining_quantity < 0 {
            return Err(CatalogError::InvalidItem(format!("item {} has a negative quantity", common.id)));
        }
        if common.remaining_quantity > MAX_ITEM_QUANTITY {
            return Err(CatalogError::InvalidItem(format!(
                "item {} holds {} units, more than {}",
                common.id, common.remaining_quantity, MAX_ITEM_QUANTITY
            )));
        }
        if common.tier_priority < 1 {
            return Err(CatalogError::InvalidItem(format!("item {} has tier priority below 1", common.id)));
        }
        if let InventoryItem::Seat(seat) = self {
            if common.remaining_quantity > 1 {
                return Err(CatalogError::InvalidItem(format!(
                    "seat {} cannot hold more than one unit",
                    seat.common.id
                )));
            }
        }
        Ok(())
    }
}

/// All inventory for one event, read at a single point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub event_id: Uuid,
    pub items: Vec<InventoryItem>,
    pub taken_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn new(event_id: Uuid, items: Vec<InventoryItem>) -> Self {
        Self {
            event_id,
            items,
            taken_at: Utc::now(),
        }
    }

    pub fn ticket_like(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.iter().filter(|i| i.is_ticket_like())
    }

    pub fn collectibles(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.iter().filter(|i| !i.is_ticket_like())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog not found for event: {0}")]
    EventNotFound(Uuid),

    #[error("Inventory item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Invalid inventory item: {0}")]
    InvalidItem(String),
}
