use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Processing,
    Succeeded,
    Canceled,
    Failed,
}

/// What the payment provider tells us once money has moved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Provider's id for the payment, unique per purchase
    pub payment_reference: String,
    pub event_id: Uuid,
    pub quantity_size: u8,
    pub buyer_id: String,
    pub buyer_email: Option<String>,
    pub amount_cents: i64,
    pub status: PaymentStatus,
}

impl PaymentConfirmation {
    /// Checks the payment itself. The requested size is checked by `is_supported_size`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.status != PaymentStatus::Succeeded {
            return Err(CoreError::ValidationError(format!(
                "payment {} has not succeeded ({:?})",
                self.payment_reference, self.status
            )));
        }
        if self.payment_reference.trim().is_empty() {
            return Err(CoreError::ValidationError("missing payment reference".to_string()));
        }
        if self.buyer_id.trim().is_empty() {
            return Err(CoreError::ValidationError("missing buyer id".to_string()));
        }
        Ok(())
    }

    pub fn is_supported_size(&self, supported_sizes: &[u8]) -> bool {
        supported_sizes.contains(&self.quantity_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation() -> PaymentConfirmation {
        PaymentConfirmation {
            payment_reference: "pi_123".to_string(),
            event_id: Uuid::new_v4(),
            quantity_size: 2,
            buyer_id: "buyer-1".to_string(),
            buyer_email: None,
            amount_cents: 26000,
            status: PaymentStatus::Succeeded,
        }
    }

    #[test]
    fn test_validate_confirmation() {
        assert!(confirmation().validate().is_ok());

        let mut failed = confirmation();
        failed.status = PaymentStatus::Failed;
        assert!(failed.validate().is_err());

        let mut anonymous = confirmation();
        anonymous.buyer_id = "  ".to_string();
        assert!(anonymous.validate().is_err());
    }

    #[test]
    fn test_supported_size() {
        let mut request = confirmation();
        assert!(request.is_supported_size(&[1, 2, 3, 4]));

        request.quantity_size = 7;
        assert!(!request.is_supported_size(&[1, 2, 3, 4]));
        assert!(request.validate().is_ok());
    }
}
