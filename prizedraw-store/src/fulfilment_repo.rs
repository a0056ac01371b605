use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use sqlx::PgPool;
use tracing::{debug, warn};
use prizedraw_core::repository::{FulfilmentOutcome, FulfilmentStore, RepoResult};
use prizedraw_core::Purchase;
use prizedraw_shared::pii::Masked;
use prizedraw_shared::{PrizeKind, PrizePool};

use crate::pool_repo::{claim_statement, PoolRow};

/// Payment completion against Postgres. Claim, mark-sold and the purchase row
/// commit together or not at all.
pub struct PostgresFulfilmentStore {
    pool: PgPool,
}

impl PostgresFulfilmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    payment_reference: String,
    event_id: Uuid,
    quantity_size: i16,
    buyer_id: String,
    buyer_email: Option<String>,
    amount_cents: i64,
    status: String,
    pool_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(Purchase {
            id: row.id,
            payment_reference: row.payment_reference,
            event_id: row.event_id,
            quantity_size: u8::try_from(row.quantity_size)?,
            buyer_id: row.buyer_id,
            buyer_email: row.buyer_email.map(Masked),
            amount_cents: row.amount_cents,
            status: row.status.parse()?,
            pool_id: row.pool_id,
            created_at: row.created_at,
        })
    }
}

const INSERT_PURCHASE: &str = r#"
    INSERT INTO purchases (id, payment_reference, event_id, quantity_size, buyer_id, buyer_email, amount_cents, status, pool_id, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    ON CONFLICT (payment_reference) DO NOTHING
"#;

fn insert_purchase(purchase: &Purchase) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_PURCHASE)
        .bind(purchase.id)
        .bind(&purchase.payment_reference)
        .bind(purchase.event_id)
        .bind(i16::from(purchase.quantity_size))
        .bind(&purchase.buyer_id)
        .bind(purchase.buyer_email.as_ref().map(|e| e.expose().as_str()))
        .bind(purchase.amount_cents)
        .bind(purchase.status.to_string())
        .bind(purchase.pool_id)
        .bind(purchase.created_at)
}

#[async_trait]
impl FulfilmentStore for PostgresFulfilmentStore {
    async fn find_purchase(&self, payment_reference: &str) -> RepoResult<Option<Purchase>> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, payment_reference, event_id, quantity_size, buyer_id, buyer_email, amount_cents, status, pool_id, created_at
            FROM purchases WHERE payment_reference = $1
            "#,
        )
        .bind(payment_reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn claim_and_fulfil(&self, pool_id: Uuid, purchase: &Purchase) -> RepoResult<FulfilmentOutcome> {
        let mut tx = self.pool.begin().await?;

        let claimed: Option<PoolRow> = sqlx::query_as(&claim_statement())
            .bind(pool_id)
            .bind(&purchase.buyer_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = claimed else {
            tx.rollback().await?;
            return Ok(FulfilmentOutcome::AlreadyClaimed);
        };
        let pool = PrizePool::try_from(row)?;

        // Pools are drawn from a snapshot, so every unit is re-checked against the live row.
        for (prize, units) in pool.units_by_item() {
            let statement = if prize.kind == PrizeKind::Seat {
                sqlx::query(
                    "UPDATE inventory_items SET seat_status = 'SOLD', remaining_quantity = 0, updated_at = NOW() \
                     WHERE id = $1 AND seat_status = 'AVAILABLE' AND remaining_quantity >= $2",
                )
            } else {
                sqlx::query(
                    "UPDATE inventory_items SET remaining_quantity = remaining_quantity - $2, updated_at = NOW() \
                     WHERE id = $1 AND remaining_quantity >= $2",
                )
            };
            let result = statement
                .bind(prize.item_id)
                .bind(units)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                warn!(
                    "Pool {} references item {} ({}) that can no longer supply {} unit(s)",
                    pool.id, prize.item_id, prize.name, units
                );
                tx.rollback().await?;
                return Ok(FulfilmentOutcome::SupplyConflict { item_id: prize.item_id });
            }
        }

        let inserted = insert_purchase(purchase).execute(&mut *tx).await?;
        if inserted.rows_affected() == 0 {
            // A concurrent delivery of the same payment got there first.
            tx.rollback().await?;
            return Ok(FulfilmentOutcome::DuplicatePayment);
        }

        tx.commit().await?;
        debug!("Pool {} fulfilled payment {}", pool.id, purchase.payment_reference);

        Ok(FulfilmentOutcome::Fulfilled(pool))
    }

    async fn record_manual_fulfilment(&self, purchase: &Purchase) -> RepoResult<()> {
        insert_purchase(purchase).execute(&self.pool).await?;
        Ok(())
    }
}
