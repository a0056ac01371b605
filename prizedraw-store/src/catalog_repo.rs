use async_trait::async_trait;
use uuid::Uuid;
use sqlx::PgPool;
use prizedraw_catalog::inventory::{Collectible, SeatTicket, SpecialPrize, TicketLevel};
use prizedraw_catalog::{CatalogSnapshot, InventoryItem, ItemCommon, SeatStatus};
use prizedraw_core::repository::{CatalogAdmin, CatalogProvider, RepoResult};

pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ITEM_COLUMNS: &str = "id, event_id, kind, name, price_cents, remaining_quantity, tier, tier_priority, \
     eligible_sizes, eligible_packs, level_name, section, row_label, seat_number, seat_status, \
     description, category, signed_by";

// One table holds every kind; kind-specific columns are NULL for the others.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    event_id: Uuid,
    kind: String,
    name: String,
    price_cents: i64,
    remaining_quantity: i32,
    tier: String,
    tier_priority: i32,
    eligible_sizes: Vec<i16>,
    eligible_packs: Vec<String>,
    level_name: Option<String>,
    section: Option<String>,
    row_label: Option<String>,
    seat_number: Option<String>,
    seat_status: Option<String>,
    description: Option<String>,
    category: Option<String>,
    signed_by: Option<String>,
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let common = ItemCommon {
            id: row.id,
            event_id: row.event_id,
            name: row.name.clone(),
            price_cents: row.price_cents,
            remaining_quantity: row.remaining_quantity,
            tier: row.tier.parse()?,
            tier_priority: row.tier_priority,
            eligible_sizes: row.eligible_sizes.iter().map(|s| *s as u8).collect(),
            eligible_packs: row.eligible_packs,
        };

        let item = match row.kind.as_str() {
            "TICKET_LEVEL" => InventoryItem::TicketLevel(TicketLevel {
                common,
                level_name: row.level_name.unwrap_or(row.name),
                section: row.section,
            }),
            "SEAT" => InventoryItem::Seat(SeatTicket {
                common,
                section: row.section.unwrap_or_default(),
                row: row.row_label.unwrap_or_default(),
                seat_number: row.seat_number.unwrap_or_default(),
                status: row.seat_status.as_deref().unwrap_or("AVAILABLE").parse::<SeatStatus>()?,
            }),
            "SPECIAL_PRIZE" => InventoryItem::SpecialPrize(SpecialPrize {
                common,
                description: row.description,
            }),
            "COLLECTIBLE" => InventoryItem::Collectible(Collectible {
                common,
                category: row.category,
                signed_by: row.signed_by,
            }),
            other => return Err(format!("unknown inventory kind {} for item {}", other, row.id).into()),
        };

        Ok(item)
    }
}

/// Column values for the kind-specific part of a row
#[derive(Default)]
struct KindColumns<'a> {
    kind: &'a str,
    level_name: Option<&'a str>,
    section: Option<&'a str>,
    row_label: Option<&'a str>,
    seat_number: Option<&'a str>,
    seat_status: Option<&'a str>,
    description: Option<&'a str>,
    category: Option<&'a str>,
    signed_by: Option<&'a str>,
}

fn kind_columns(item: &InventoryItem) -> KindColumns<'_> {
    match item {
        InventoryItem::TicketLevel(t) => KindColumns {
            kind: "TICKET_LEVEL",
            level_name: Some(&t.level_name),
            section: t.section.as_deref(),
            ..Default::default()
        },
        InventoryItem::Seat(s) => KindColumns {
            kind: "SEAT",
            section: Some(&s.section),
            row_label: Some(&s.row),
            seat_number: Some(&s.seat_number),
            seat_status: Some(s.status.as_str()),
            ..Default::default()
        },
        InventoryItem::SpecialPrize(p) => KindColumns {
            kind: "SPECIAL_PRIZE",
            description: p.description.as_deref(),
            ..Default::default()
        },
        InventoryItem::Collectible(c) => KindColumns {
            kind: "COLLECTIBLE",
            category: c.category.as_deref(),
            signed_by: c.signed_by.as_deref(),
            ..Default::default()
        },
    }
}

#[async_trait]
impl CatalogProvider for PostgresCatalogRepository {
    async fn snapshot(&self, event_id: Uuid) -> RepoResult<Option<CatalogSnapshot>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Ok(None);
        }

        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM inventory_items WHERE event_id = $1 ORDER BY kind, name",
            ITEM_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(InventoryItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CatalogSnapshot::new(event_id, items)))
    }
}

#[async_trait]
impl CatalogAdmin for PostgresCatalogRepository {
    async fn upsert_item(&self, item: &InventoryItem) -> RepoResult<()> {
        let common = item.common();
        let columns = kind_columns(item);
        let sizes: Vec<i16> = common.eligible_sizes.iter().map(|s| i16::from(*s)).collect();

        // The row lock taken by ON CONFLICT DO UPDATE serialises this edit against
        // a concurrent sale touching the same item.
        sqlx::query(
            r#"
            INSERT INTO inventory_items (id, event_id, kind, name, price_cents, remaining_quantity, tier, tier_priority,
                eligible_sizes, eligible_packs, level_name, section, row_label, seat_number, seat_status,
                description, category, signed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE SET
                kind = EXCLUDED.kind,
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                remaining_quantity = EXCLUDED.remaining_quantity,
                tier = EXCLUDED.tier,
                tier_priority = EXCLUDED.tier_priority,
                eligible_sizes = EXCLUDED.eligible_sizes,
                eligible_packs = EXCLUDED.eligible_packs,
                level_name = EXCLUDED.level_name,
                section = EXCLUDED.section,
                row_label = EXCLUDED.row_label,
                seat_number = EXCLUDED.seat_number,
                seat_status = EXCLUDED.seat_status,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                signed_by = EXCLUDED.signed_by,
                updated_at = NOW()
            WHERE inventory_items.event_id = EXCLUDED.event_id
            "#,
        )
        .bind(common.id)
        .bind(common.event_id)
        .bind(columns.kind)
        .bind(&common.name)
        .bind(common.price_cents)
        .bind(common.remaining_quantity)
        .bind(common.tier.to_string())
        .bind(common.tier_priority)
        .bind(sizes)
        .bind(&common.eligible_packs)
        .bind(columns.level_name)
        .bind(columns.section)
        .bind(columns.row_label)
        .bind(columns.seat_number)
        .bind(columns.seat_status)
        .bind(columns.description)
        .bind(columns.category)
        .bind(columns.signed_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_item(&self, event_id: Uuid, item_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1 AND event_id = $2")
            .bind(item_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
