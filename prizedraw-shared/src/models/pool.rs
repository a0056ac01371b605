use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::prize::PrizeRef;

/// Pool lifecycle. AVAILABLE is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolState {
    Available,
    Claimed,
    Stale,
}

impl PoolState {
    /// Only AVAILABLE -> CLAIMED and AVAILABLE -> STALE exist.
    pub fn can_transition_to(&self, next: PoolState) -> bool {
        matches!(
            (self, next),
            (PoolState::Available, PoolState::Claimed) | (PoolState::Available, PoolState::Stale)
        )
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolState::Available => "AVAILABLE",
            PoolState::Claimed => "CLAIMED",
            PoolState::Stale => "STALE",
        };
        f.write_str(s)
    }
}

impl FromStr for PoolState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(PoolState::Available),
            "CLAIMED" => Ok(PoolState::Claimed),
            "STALE" => Ok(PoolState::Stale),
            other => Err(format!("unknown pool state: {}", other)),
        }
    }
}

/// One ticket-like prize paired with one collectible
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bundle {
    pub ticket: PrizeRef,
    pub collectible: PrizeRef,
}

impl Bundle {
    pub fn new(ticket: PrizeRef, collectible: PrizeRef) -> Self {
        Self { ticket, collectible }
    }

    pub fn value_cents(&self) -> i64 {
        self.ticket.value_cents + self.collectible.value_cents
    }
}

/// A pre-generated purchase outcome for one (event, quantity size) key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizePool {
    pub id: Uuid,
    pub event_id: Uuid,
    pub quantity_size: u8,
    pub bundles: Vec<Bundle>,
    pub total_value_cents: i64,
    pub total_price_cents: i64,
    pub state: PoolState,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<String>,
}

impl PrizePool {
    pub fn new(
        event_id: Uuid,
        quantity_size: u8,
        bundles: Vec<Bundle>,
        total_value_cents: i64,
        total_price_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            quantity_size,
            bundles,
            total_value_cents,
            total_price_cents,
            state: PoolState::Available,
            created_at: Utc::now(),
            claimed_at: None,
            claimed_by: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.state == PoolState::Available
    }

    /// Units of each physical item this pool consumes when sold, keyed by item id.
    pub fn units_by_item(&self) -> Vec<(&PrizeRef, i32)> {
        let mut units: BTreeMap<Uuid, (&PrizeRef, i32)> = BTreeMap::new();
        for bundle in &self.bundles {
            for prize in [&bundle.ticket, &bundle.collectible] {
                units.entry(prize.item_id).or_insert((prize, 0)).1 += 1;
            }
        }
        units.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prize::{PrizeKind, Tier};

    fn prize(kind: PrizeKind, value: i64) -> PrizeRef {
        PrizeRef {
            item_id: Uuid::new_v4(),
            kind,
            name: "Prize".to_string(),
            value_cents: value,
            tier: Tier::Standard,
            detail: None,
        }
    }

    #[test]
    fn test_state_transitions_are_one_way() {
        assert!(PoolState::Available.can_transition_to(PoolState::Claimed));
        assert!(PoolState::Available.can_transition_to(PoolState::Stale));
        assert!(!PoolState::Claimed.can_transition_to(PoolState::Available));
        assert!(!PoolState::Claimed.can_transition_to(PoolState::Stale));
        assert!(!PoolState::Stale.can_transition_to(PoolState::Claimed));
        assert_eq!("STALE".parse::<PoolState>().unwrap(), PoolState::Stale);
    }

    #[test]
    fn test_units_by_item_counts_shared_ticket() {
        let ticket = prize(PrizeKind::TicketLevel, 10000);
        let bundles = vec![
            Bundle::new(ticket.clone(), prize(PrizeKind::Collectible, 2000)),
            Bundle::new(ticket.clone(), prize(PrizeKind::Collectible, 3000)),
        ];
        let pool = PrizePool::new(Uuid::new_v4(), 2, bundles, 25000, 32500);

        let units = pool.units_by_item();
        assert_eq!(units.len(), 3);
        let ticket_units = units.iter().find(|(p, _)| p.item_id == ticket.item_id).unwrap().1;
        assert_eq!(ticket_units, 2);
    }
}
