pub mod generator;
pub mod health;
pub mod queue;

pub use generator::PoolGenerator;
pub use health::{MonitorSettings, PoolHealthMonitor, PoolRegenerator};
pub use queue::{ReplenishJob, ReplenishMetrics, ReplenishQueue, ReplenishWorker};

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("No catalog found for event {0}")]
    EventNotFound(Uuid),
    #[error("No prize pool available for event {event_id}, quantity size {quantity_size}")]
    Exhausted { event_id: Uuid, quantity_size: u8 },
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for PoolError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        PoolError::Storage(err.to_string())
    }
}
