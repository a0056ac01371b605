use serde::Deserialize;
use std::env;
use prizedraw_catalog::{PricingConfig, PricingMode, DEFAULT_PACKS, DEFAULT_QUANTITY_SIZES};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub prize_rules: PrizeRules,
}

/// Tunables for pricing and pool upkeep
#[derive(Debug, Deserialize, Clone)]
pub struct PrizeRules {
    #[serde(default = "default_margin")]
    pub margin_percentage: f64,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    #[serde(default = "default_batch")]
    pub pools_per_batch: usize,
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
    #[serde(default = "default_batch")]
    pub target_available: usize,
    #[serde(default = "default_sizes")]
    pub quantity_sizes: Vec<u8>,
    #[serde(default = "default_packs")]
    pub packs: Vec<String>,
    #[serde(default = "default_queue_capacity")]
    pub replenish_queue_capacity: usize,
    #[serde(default = "default_cache_ttl")]
    pub price_cache_ttl_seconds: u64,
}

fn default_margin() -> f64 { 30.0 }
fn default_batch() -> usize { 5 }
fn default_low_water_mark() -> usize { 3 }
fn default_sizes() -> Vec<u8> { DEFAULT_QUANTITY_SIZES.to_vec() }
fn default_packs() -> Vec<String> { DEFAULT_PACKS.iter().map(|p| p.to_string()).collect() }
fn default_queue_capacity() -> usize { 256 }
fn default_cache_ttl() -> u64 { 30 }

impl Default for PrizeRules {
    fn default() -> Self {
        Self {
            margin_percentage: default_margin(),
            pricing_mode: PricingMode::default(),
            pools_per_batch: default_batch(),
            low_water_mark: default_low_water_mark(),
            target_available: default_batch(),
            quantity_sizes: default_sizes(),
            packs: default_packs(),
            replenish_queue_capacity: default_queue_capacity(),
            price_cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl PrizeRules {
    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            margin_percentage: self.margin_percentage,
            mode: self.pricing_mode,
        }
    }

    pub fn supports_size(&self, quantity_size: u8) -> bool {
        self.quantity_sizes.contains(&quantity_size)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Serve from process memory instead of Postgres (local runs only)
    #[serde(default)]
    pub in_memory: bool,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Price cache is skipped entirely when unset
    pub url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `PRIZEDRAW__PRIZE_RULES__MARGIN_PERCENTAGE=25`
            .add_source(config::Environment::with_prefix("PRIZEDRAW").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
