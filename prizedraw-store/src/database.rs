use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};
use serde_json::Value;
use prizedraw_catalog::PricingMode;

use crate::app_config::PrizeRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rows from `business_rules` on top of the file/env configuration.
    pub async fn fetch_prize_rules(&self, defaults: PrizeRules) -> Result<PrizeRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for (key, value) in rows {
            apply_rule(&mut rules, &key, &value);
        }

        Ok(rules)
    }
}

/// Expected row format: `{"value": <number | string | array>}`
fn apply_rule(rules: &mut PrizeRules, key: &str, value: &Value) {
    let Some(v) = value.get("value") else {
        warn!("business rule {} has no value field, ignoring", key);
        return;
    };

    match key {
        "margin_percentage" => {
            if let Some(f) = v.as_f64() {
                rules.margin_percentage = f;
            }
        }
        "pricing_mode" => {
            if let Ok(mode) = serde_json::from_value::<PricingMode>(v.clone()) {
                rules.pricing_mode = mode;
            }
        }
        "pools_per_batch" => {
            if let Some(u) = v.as_u64() {
                rules.pools_per_batch = u as usize;
            }
        }
        "low_water_mark" => {
            if let Some(u) = v.as_u64() {
                rules.low_water_mark = u as usize;
            }
        }
        "target_available" => {
            if let Some(u) = v.as_u64() {
                rules.target_available = u as usize;
            }
        }
        "packs" => {
            if let Ok(packs) = serde_json::from_value::<Vec<String>>(v.clone()) {
                rules.packs = packs;
            }
        }
        "quantity_sizes" => {
            if let Ok(sizes) = serde_json::from_value::<Vec<u8>>(v.clone()) {
                rules.quantity_sizes = sizes;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rule_overrides() {
        let mut rules = PrizeRules::default();
        apply_rule(&mut rules, "margin_percentage", &serde_json::json!({"value": 40.0}));
        apply_rule(&mut rules, "pricing_mode", &serde_json::json!({"value": "ticket_and_collectible"}));
        apply_rule(&mut rules, "packs", &serde_json::json!({"value": ["blue", "gold"]}));
        apply_rule(&mut rules, "low_water_mark", &serde_json::json!({"nope": 1}));
        apply_rule(&mut rules, "unknown_key", &serde_json::json!({"value": 1}));

        assert_eq!(rules.margin_percentage, 40.0);
        assert_eq!(rules.pricing_mode, PricingMode::TicketAndCollectible);
        assert_eq!(rules.packs, vec!["blue", "gold"]);
        assert_eq!(rules.low_water_mark, 3);
    }
}
