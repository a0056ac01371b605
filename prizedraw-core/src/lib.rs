pub mod repository;
pub mod payment;
pub mod purchase;

pub use repository::{
    CatalogAdmin, CatalogProvider, ClaimOutcome, FulfilmentOutcome, FulfilmentStore, PoolRepository,
    RepoResult,
};
pub use payment::{PaymentConfirmation, PaymentStatus};
pub use purchase::{Purchase, PurchaseStatus};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
