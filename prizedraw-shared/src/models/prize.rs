use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;
use std::str::FromStr;

/// Rarity classification of an inventory item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Vip,
    Gold,
    Standard,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Vip => "VIP",
            Tier::Gold => "GOLD",
            Tier::Standard => "STANDARD",
        };
        f.write_str(s)
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIP" => Ok(Tier::Vip),
            "GOLD" => Ok(Tier::Gold),
            "STANDARD" => Ok(Tier::Standard),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// The four concrete inventory kinds a prize can be drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrizeKind {
    TicketLevel,
    Seat,
    SpecialPrize,
    Collectible,
}

impl PrizeKind {
    pub fn is_ticket_like(&self) -> bool {
        !matches!(self, PrizeKind::Collectible)
    }
}

/// A catalog item resolved to the fields a buyer sees inside a bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeRef {
    pub item_id: Uuid,
    pub kind: PrizeKind,
    pub name: String,
    pub value_cents: i64,
    pub tier: Tier,
    /// Human-readable placement or provenance, e.g. "Section 104, Row F, Seat 12"
    pub detail: Option<String>,
}
