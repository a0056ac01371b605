pub mod orchestrator;

pub use orchestrator::{CompletedPurchase, PurchaseOrchestrator};

use uuid::Uuid;
use prizedraw_core::CoreError;
use prizedraw_pool::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error("No catalog found for event {0}")]
    EventNotFound(Uuid),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ClaimError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ClaimError::Storage(err.to_string())
    }
}

impl From<PoolError> for ClaimError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::EventNotFound(event_id) => ClaimError::EventNotFound(event_id),
            other => ClaimError::Storage(other.to_string()),
        }
    }
}
