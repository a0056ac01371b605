pub mod models;
pub mod pii;

pub use models::pool::{Bundle, PoolState, PrizePool};
pub use models::prize::{PrizeKind, PrizeRef, Tier};
