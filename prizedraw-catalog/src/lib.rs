pub mod inventory;
pub mod pricing;
pub mod featured;

pub use inventory::{CatalogError, CatalogSnapshot, InventoryItem, ItemCommon, SeatStatus};
pub use pricing::{PriceFilter, PriceMatrix, PriceQuote, PricingConfig, PricingEngine, PricingMode};
pub use featured::FeaturedPrizes;

/// Quantity sizes sold when configuration does not say otherwise
pub const DEFAULT_QUANTITY_SIZES: [u8; 4] = [1, 2, 3, 4];

/// Largest stock one inventory row may carry. Draws expand stock into one entry per unit.
pub const MAX_ITEM_QUANTITY: i32 = 100_000;

/// Access tiers priced independently when configuration does not say otherwise
pub const DEFAULT_PACKS: [&str; 3] = ["blue", "red", "gold"];
