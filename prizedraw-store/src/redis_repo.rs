use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;
use prizedraw_catalog::{FeaturedPrizes, PriceMatrix};

type CacheResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Short-lived cache for display prices and featured prizes.
/// Every caller treats a failure here as a cache miss.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn get_price_matrix(&self, event_id: Uuid) -> CacheResult<Option<PriceMatrix>> {
        self.get_json(&pricing_key(event_id)).await
    }

    pub async fn set_price_matrix(&self, matrix: &PriceMatrix, ttl_seconds: u64) -> CacheResult<()> {
        self.set_json(&pricing_key(matrix.event_id), matrix, ttl_seconds).await
    }

    pub async fn get_featured(&self, event_id: Uuid) -> CacheResult<Option<FeaturedPrizes>> {
        self.get_json(&featured_key(event_id)).await
    }

    pub async fn set_featured(&self, featured: &FeaturedPrizes, ttl_seconds: u64) -> CacheResult<()> {
        self.set_json(&featured_key(featured.event_id), featured, ttl_seconds).await
    }

    /// Drop everything cached for an event after its catalog changes.
    pub async fn invalidate_event(&self, event_id: Uuid) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys = vec![pricing_key(event_id), featured_key(event_id)];
        let _: () = conn.del(keys).await?;
        debug!("Price cache invalidated for event {}", event_id);
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, json, ttl_seconds).await?;
        Ok(())
    }
}

fn pricing_key(event_id: Uuid) -> String {
    format!("prizedraw:pricing:{}", event_id)
}

fn featured_key(event_id: Uuid) -> String {
    format!("prizedraw:featured:{}", event_id)
}
