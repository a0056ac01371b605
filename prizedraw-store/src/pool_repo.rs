use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use sqlx::types::Json;
use sqlx::PgPool;
use prizedraw_core::repository::{ClaimOutcome, PoolRepository, RepoResult};
use prizedraw_shared::{Bundle, PrizePool};

pub struct PostgresPoolRepository {
    pool: PgPool,
}

impl PostgresPoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const POOL_COLUMNS: &str =
    "id, event_id, quantity_size, bundles, total_value_cents, total_price_cents, state, created_at, claimed_at, claimed_by";

#[derive(sqlx::FromRow)]
pub(crate) struct PoolRow {
    id: Uuid,
    event_id: Uuid,
    quantity_size: i16,
    bundles: Json<Vec<Bundle>>,
    total_value_cents: i64,
    total_price_cents: i64,
    state: String,
    created_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
    claimed_by: Option<String>,
}

impl TryFrom<PoolRow> for PrizePool {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: PoolRow) -> Result<Self, Self::Error> {
        Ok(PrizePool {
            id: row.id,
            event_id: row.event_id,
            quantity_size: u8::try_from(row.quantity_size)?,
            bundles: row.bundles.0,
            total_value_cents: row.total_value_cents,
            total_price_cents: row.total_price_cents,
            state: row.state.parse()?,
            created_at: row.created_at,
            claimed_at: row.claimed_at,
            claimed_by: row.claimed_by,
        })
    }
}

/// AVAILABLE -> CLAIMED as one conditional statement. Zero rows means somebody else won.
pub(crate) fn claim_statement() -> String {
    format!(
        "UPDATE prize_pools SET state = 'CLAIMED', claimed_at = NOW(), claimed_by = $2 \
         WHERE id = $1 AND state = 'AVAILABLE' RETURNING {}",
        POOL_COLUMNS
    )
}

#[async_trait]
impl PoolRepository for PostgresPoolRepository {
    async fn insert_pool(&self, pool: &PrizePool) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO prize_pools (id, event_id, quantity_size, bundles, total_value_cents, total_price_cents, state, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(pool.id)
        .bind(pool.event_id)
        .bind(i16::from(pool.quantity_size))
        .bind(Json(&pool.bundles))
        .bind(pool.total_value_cents)
        .bind(pool.total_price_cents)
        .bind(pool.state.to_string())
        .bind(pool.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pool(&self, id: Uuid) -> RepoResult<Option<PrizePool>> {
        let row: Option<PoolRow> = sqlx::query_as(&format!("SELECT {} FROM prize_pools WHERE id = $1", POOL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PrizePool::try_from).transpose()
    }

    async fn count_available(&self, event_id: Uuid, quantity_size: u8) -> RepoResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM prize_pools WHERE event_id = $1 AND quantity_size = $2 AND state = 'AVAILABLE'",
        )
        .bind(event_id)
        .bind(i16::from(quantity_size))
        .fetch_one(&self.pool)
        .await?;

        Ok(count as usize)
    }

    async fn pick_available(&self, event_id: Uuid, quantity_size: u8) -> RepoResult<Option<PrizePool>> {
        let row: Option<PoolRow> = sqlx::query_as(&format!(
            "SELECT {} FROM prize_pools WHERE event_id = $1 AND quantity_size = $2 AND state = 'AVAILABLE' \
             ORDER BY random() LIMIT 1",
            POOL_COLUMNS
        ))
        .bind(event_id)
        .bind(i16::from(quantity_size))
        .fetch_optional(&self.pool)
        .await?;

        row.map(PrizePool::try_from).transpose()
    }

    async fn mark_stale(&self, event_id: Uuid, quantity_size: Option<u8>) -> RepoResult<u64> {
        let result = sqlx::query(
            "UPDATE prize_pools SET state = 'STALE' \
             WHERE event_id = $1 AND state = 'AVAILABLE' AND ($2::SMALLINT IS NULL OR quantity_size = $2)",
        )
        .bind(event_id)
        .bind(quantity_size.map(i16::from))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn claim(&self, pool_id: Uuid, buyer_id: &str) -> RepoResult<ClaimOutcome> {
        let row: Option<PoolRow> = sqlx::query_as(&claim_statement())
            .bind(pool_id)
            .bind(buyer_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(ClaimOutcome::Claimed(PrizePool::try_from(row)?)),
            None => Ok(ClaimOutcome::AlreadyClaimed),
        }
    }
}
