use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use prizedraw_shared::pii::Masked;

use crate::payment::PaymentConfirmation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Fulfilled,
    /// Money was captured but no pool could be allocated; a person has to step in.
    RequiresManualFulfilment,
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PurchaseStatus::Fulfilled => "FULFILLED",
            PurchaseStatus::RequiresManualFulfilment => "REQUIRES_MANUAL_FULFILMENT",
        };
        f.write_str(s)
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULFILLED" => Ok(PurchaseStatus::Fulfilled),
            "REQUIRES_MANUAL_FULFILMENT" => Ok(PurchaseStatus::RequiresManualFulfilment),
            other => Err(format!("unknown purchase status: {}", other)),
        }
    }
}

/// Record of a paid bundle purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub payment_reference: String,
    pub event_id: Uuid,
    pub quantity_size: u8,
    pub buyer_id: String,
    pub buyer_email: Option<Masked<String>>,
    pub amount_cents: i64,
    pub status: PurchaseStatus,
    pub pool_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// A purchase that will be fulfilled by `pool_id` if the claim goes through
    pub fn for_pool(confirmation: &PaymentConfirmation, pool_id: Uuid) -> Self {
        let mut purchase = Self::from_confirmation(confirmation, PurchaseStatus::Fulfilled);
        purchase.pool_id = Some(pool_id);
        purchase
    }

    pub fn manual(confirmation: &PaymentConfirmation) -> Self {
        Self::from_confirmation(confirmation, PurchaseStatus::RequiresManualFulfilment)
    }

    fn from_confirmation(confirmation: &PaymentConfirmation, status: PurchaseStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_reference: confirmation.payment_reference.clone(),
            event_id: confirmation.event_id,
            quantity_size: confirmation.quantity_size,
            buyer_id: confirmation.buyer_id.clone(),
            buyer_email: confirmation.buyer_email.clone().map(Masked),
            amount_cents: confirmation.amount_cents,
            status,
            pool_id: None,
            created_at: Utc::now(),
        }
    }
}
