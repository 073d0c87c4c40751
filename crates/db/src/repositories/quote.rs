use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use slideboard_core::domain::product::{ProductCategory, ProductId};
use slideboard_core::domain::quote::{
    CustomerId, Quote, QuoteId, QuoteItem, QuoteItemId, QuoteRoom, QuoteRoomId, QuoteStatus,
    QuoteTree, TenantId, UserId,
};
use slideboard_core::money::to_wire;
use slideboard_core::quoting::totals::QuoteTotals;

use super::{
    column, decimal_column, optional_decimal_column, optional_timestamp_column, parse_enum,
    timestamp, timestamp_column, QuoteRepository, RepositoryError,
};
use crate::DbPool;

const QUOTE_COLUMNS: &str = "id, tenant_id, customer_id, quote_no, version, status, is_active,
    parent_quote_id, root_quote_id, title, total_amount, discount_rate, discount_amount,
    final_amount, valid_until, notes, created_by, created_at, updated_at";

const ROOM_COLUMNS: &str =
    "id, tenant_id, quote_id, name, measure_room_id, sort_order, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, tenant_id, quote_id, room_id, parent_id, category, product_id,
    product_name, unit, unit_price, quantity, width, height, subtotal, attributes, sort_order,
    created_at, updated_at";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_tree(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<QuoteTree>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_tree(&mut conn, tenant_id, id).await
    }

    async fn list_family(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let Some(quote) = fetch_quote(&mut conn, tenant_id, id).await? else {
            return Ok(Vec::new());
        };
        fetch_family(&mut conn, tenant_id, &quote.family_root()).await
    }

    async fn insert_tree(&self, tree: &QuoteTree) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        insert_quote(&mut tx, &tree.quote).await?;
        for room in &tree.rooms {
            insert_room(&mut tx, room).await?;
        }
        for item in &tree.items {
            insert_item(&mut tx, item).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let version: i64 = column(row, "version")?;
    let status: String = column(row, "status")?;

    Ok(Quote {
        id: QuoteId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        customer_id: CustomerId(column(row, "customer_id")?),
        quote_no: column(row, "quote_no")?,
        version: u32::try_from(version)
            .map_err(|_| RepositoryError::Decode(format!("version: {version} out of range")))?,
        status: parse_enum::<QuoteStatus>("status", &status)?,
        is_active: column(row, "is_active")?,
        parent_quote_id: column::<Option<String>>(row, "parent_quote_id")?.map(QuoteId),
        root_quote_id: column::<Option<String>>(row, "root_quote_id")?.map(QuoteId),
        title: column(row, "title")?,
        total_amount: decimal_column(row, "total_amount")?,
        discount_rate: optional_decimal_column(row, "discount_rate")?,
        discount_amount: decimal_column(row, "discount_amount")?,
        final_amount: decimal_column(row, "final_amount")?,
        valid_until: optional_timestamp_column(row, "valid_until")?,
        notes: column(row, "notes")?,
        created_by: UserId(column(row, "created_by")?),
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn row_to_room(row: &SqliteRow) -> Result<QuoteRoom, RepositoryError> {
    Ok(QuoteRoom {
        id: QuoteRoomId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        quote_id: QuoteId(column(row, "quote_id")?),
        name: column(row, "name")?,
        measure_room_id: column(row, "measure_room_id")?,
        sort_order: column(row, "sort_order")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

fn row_to_item(row: &SqliteRow) -> Result<QuoteItem, RepositoryError> {
    let category: String = column(row, "category")?;
    let attributes: String = column(row, "attributes")?;

    Ok(QuoteItem {
        id: QuoteItemId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        quote_id: QuoteId(column(row, "quote_id")?),
        room_id: column::<Option<String>>(row, "room_id")?.map(QuoteRoomId),
        parent_id: column::<Option<String>>(row, "parent_id")?.map(QuoteItemId),
        category: parse_enum::<ProductCategory>("category", &category)?,
        product_id: column::<Option<String>>(row, "product_id")?.map(ProductId),
        product_name: column(row, "product_name")?,
        unit: column(row, "unit")?,
        unit_price: decimal_column(row, "unit_price")?,
        quantity: decimal_column(row, "quantity")?,
        width: optional_decimal_column(row, "width")?,
        height: optional_decimal_column(row, "height")?,
        subtotal: decimal_column(row, "subtotal")?,
        attributes: serde_json::from_str(&attributes)
            .map_err(|e| RepositoryError::Decode(format!("attributes: {e}")))?,
        sort_order: column(row, "sort_order")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

pub async fn fetch_quote(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
) -> Result<Option<Quote>, RepositoryError> {
    let row = sqlx::query(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quote WHERE tenant_id = ? AND id = ?"
    ))
    .bind(&tenant_id.0)
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(row_to_quote).transpose()
}

pub async fn fetch_rooms(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
) -> Result<Vec<QuoteRoom>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {ROOM_COLUMNS} FROM quote_room
         WHERE tenant_id = ? AND quote_id = ?
         ORDER BY sort_order ASC, created_at ASC, id ASC"
    ))
    .bind(&tenant_id.0)
    .bind(&quote_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_room).collect()
}

pub async fn fetch_items(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
) -> Result<Vec<QuoteItem>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM quote_item
         WHERE tenant_id = ? AND quote_id = ?
         ORDER BY sort_order ASC, created_at ASC, id ASC"
    ))
    .bind(&tenant_id.0)
    .bind(&quote_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_item).collect()
}

pub async fn fetch_tree(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
) -> Result<Option<QuoteTree>, RepositoryError> {
    let Some(quote) = fetch_quote(conn, tenant_id, id).await? else {
        return Ok(None);
    };
    let rooms = fetch_rooms(conn, tenant_id, id).await?;
    let items = fetch_items(conn, tenant_id, id).await?;
    Ok(Some(QuoteTree { quote, rooms, items }))
}

/// Family members are the root itself plus every quote naming it as root.
pub async fn fetch_family(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    root_id: &QuoteId,
) -> Result<Vec<Quote>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quote
         WHERE tenant_id = ? AND (root_quote_id = ? OR id = ?)
         ORDER BY version ASC, created_at ASC"
    ))
    .bind(&tenant_id.0)
    .bind(&root_id.0)
    .bind(&root_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_quote).collect()
}

pub async fn insert_quote(
    conn: &mut SqliteConnection,
    quote: &Quote,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO quote ({QUOTE_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&quote.id.0)
    .bind(&quote.tenant_id.0)
    .bind(&quote.customer_id.0)
    .bind(&quote.quote_no)
    .bind(i64::from(quote.version))
    .bind(quote.status.as_str())
    .bind(quote.is_active)
    .bind(quote.parent_quote_id.as_ref().map(|id| id.0.as_str()))
    .bind(quote.root_quote_id.as_ref().map(|id| id.0.as_str()))
    .bind(&quote.title)
    .bind(to_wire(quote.total_amount))
    .bind(quote.discount_rate.map(|rate| rate.to_string()))
    .bind(to_wire(quote.discount_amount))
    .bind(to_wire(quote.final_amount))
    .bind(quote.valid_until.map(timestamp))
    .bind(&quote.notes)
    .bind(&quote.created_by.0)
    .bind(timestamp(quote.created_at))
    .bind(timestamp(quote.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_room(
    conn: &mut SqliteConnection,
    room: &QuoteRoom,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!("INSERT INTO quote_room ({ROOM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"))
        .bind(&room.id.0)
        .bind(&room.tenant_id.0)
        .bind(&room.quote_id.0)
        .bind(&room.name)
        .bind(&room.measure_room_id)
        .bind(room.sort_order)
        .bind(timestamp(room.created_at))
        .bind(timestamp(room.updated_at))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    item: &QuoteItem,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO quote_item ({ITEM_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&item.id.0)
    .bind(&item.tenant_id.0)
    .bind(&item.quote_id.0)
    .bind(item.room_id.as_ref().map(|id| id.0.as_str()))
    .bind(item.parent_id.as_ref().map(|id| id.0.as_str()))
    .bind(item.category.as_str())
    .bind(item.product_id.as_ref().map(|id| id.0.as_str()))
    .bind(&item.product_name)
    .bind(&item.unit)
    .bind(to_wire(item.unit_price))
    .bind(item.quantity.to_string())
    .bind(item.width.map(|value| value.to_string()))
    .bind(item.height.map(|value| value.to_string()))
    .bind(to_wire(item.subtotal))
    .bind(item.attributes.to_string())
    .bind(item.sort_order)
    .bind(timestamp(item.created_at))
    .bind(timestamp(item.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Records a root written without `root_quote_id` as its own root.
pub async fn backfill_root(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE quote SET root_quote_id = id
         WHERE tenant_id = ? AND id = ? AND root_quote_id IS NULL",
    )
    .bind(&tenant_id.0)
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn deactivate_family(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    root_id: &QuoteId,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE quote SET is_active = 0, updated_at = ?
         WHERE tenant_id = ? AND (root_quote_id = ? OR id = ?) AND is_active = 1",
    )
    .bind(timestamp(now))
    .bind(&tenant_id.0)
    .bind(&root_id.0)
    .bind(&root_id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn activate(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result =
        sqlx::query("UPDATE quote SET is_active = 1, updated_at = ? WHERE tenant_id = ? AND id = ?")
            .bind(timestamp(now))
            .bind(&tenant_id.0)
            .bind(&id.0)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected())
}

pub async fn update_status(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
    status: QuoteStatus,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result =
        sqlx::query("UPDATE quote SET status = ?, updated_at = ? WHERE tenant_id = ? AND id = ?")
            .bind(status.as_str())
            .bind(timestamp(now))
            .bind(&tenant_id.0)
            .bind(&id.0)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected())
}

/// Moves a quote back to `Draft` with a new validity deadline.
pub async fn reopen_as_draft(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
    valid_until: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE quote SET status = ?, valid_until = ?, updated_at = ?
         WHERE tenant_id = ? AND id = ?",
    )
    .bind(QuoteStatus::Draft.as_str())
    .bind(timestamp(valid_until))
    .bind(timestamp(now))
    .bind(&tenant_id.0)
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn update_totals(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    id: &QuoteId,
    totals: &QuoteTotals,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE quote SET total_amount = ?, discount_amount = ?, final_amount = ?, updated_at = ?
         WHERE tenant_id = ? AND id = ?",
    )
    .bind(to_wire(totals.total_amount))
    .bind(to_wire(totals.discount_amount))
    .bind(to_wire(totals.final_amount))
    .bind(timestamp(now))
    .bind(&tenant_id.0)
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Writes measured dimensions onto an item of `quote_id`. Items of other
/// quotes or tenants are left alone and report zero rows.
pub async fn update_item_dimensions(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
    item_id: &QuoteItemId,
    width: Decimal,
    height: Decimal,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE quote_item SET width = ?, height = ?, updated_at = ?
         WHERE tenant_id = ? AND quote_id = ? AND id = ?",
    )
    .bind(width.to_string())
    .bind(height.to_string())
    .bind(timestamp(now))
    .bind(&tenant_id.0)
    .bind(&quote_id.0)
    .bind(&item_id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn update_item_pricing(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    item_id: &QuoteItemId,
    unit_price: Decimal,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE quote_item SET unit_price = ?, subtotal = ?, updated_at = ?
         WHERE tenant_id = ? AND id = ?",
    )
    .bind(to_wire(unit_price))
    .bind(to_wire(subtotal))
    .bind(timestamp(now))
    .bind(&tenant_id.0)
    .bind(&item_id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn next_room_sort_order(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
) -> Result<i32, RepositoryError> {
    let max: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(sort_order) FROM quote_room WHERE tenant_id = ? AND quote_id = ?",
    )
    .bind(&tenant_id.0)
    .bind(&quote_id.0)
    .fetch_one(&mut *conn)
    .await?;

    let next = max.map_or(0, |value| value + 1);
    i32::try_from(next).map_err(|_| RepositoryError::Decode(format!("sort_order {next} overflow")))
}

pub async fn next_item_sort_order(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    quote_id: &QuoteId,
) -> Result<i32, RepositoryError> {
    let max: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(sort_order) FROM quote_item WHERE tenant_id = ? AND quote_id = ?",
    )
    .bind(&tenant_id.0)
    .bind(&quote_id.0)
    .fetch_one(&mut *conn)
    .await?;

    let next = max.map_or(0, |value| value + 1);
    i32::try_from(next).map_err(|_| RepositoryError::Decode(format!("sort_order {next} overflow")))
}

/// Ids of quotes whose validity lapsed before `now` while still open.
/// `tenant_id = None` sweeps every tenant.
pub async fn overdue_quote_ids(
    conn: &mut SqliteConnection,
    tenant_id: Option<&TenantId>,
    now: DateTime<Utc>,
) -> Result<Vec<QuoteId>, RepositoryError> {
    let [first, second, third] = QuoteStatus::EXPIRABLE;
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM quote
         WHERE (? IS NULL OR tenant_id = ?)
           AND valid_until IS NOT NULL AND valid_until < ?
           AND status IN (?, ?, ?)
         ORDER BY valid_until ASC, id ASC",
    )
    .bind(tenant_id.map(|id| id.0.as_str()))
    .bind(tenant_id.map(|id| id.0.as_str()))
    .bind(timestamp(now))
    .bind(first.as_str())
    .bind(second.as_str())
    .bind(third.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids.into_iter().map(QuoteId).collect())
}

pub async fn expire_overdue(
    conn: &mut SqliteConnection,
    tenant_id: Option<&TenantId>,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let [first, second, third] = QuoteStatus::EXPIRABLE;
    let result = sqlx::query(
        "UPDATE quote SET status = ?, updated_at = ?
         WHERE (? IS NULL OR tenant_id = ?)
           AND valid_until IS NOT NULL AND valid_until < ?
           AND status IN (?, ?, ?)",
    )
    .bind(QuoteStatus::Expired.as_str())
    .bind(timestamp(now))
    .bind(tenant_id.map(|id| id.0.as_str()))
    .bind(tenant_id.map(|id| id.0.as_str()))
    .bind(timestamp(now))
    .bind(first.as_str())
    .bind(second.as_str())
    .bind(third.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use slideboard_core::domain::product::ProductCategory;
    use slideboard_core::domain::quote::{
        CustomerId, Quote, QuoteId, QuoteItem, QuoteItemId, QuoteRoom, QuoteRoomId, QuoteStatus,
        QuoteTree, TenantId, UserId,
    };

    use super::SqlQuoteRepository;
    use crate::repositories::QuoteRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_tree(tenant: &TenantId) -> QuoteTree {
        let now = Utc::now();
        let quote_id = QuoteId("Q-2026-0001".to_string());
        let room_id = QuoteRoomId("R-1".to_string());
        QuoteTree {
            quote: Quote {
                id: quote_id.clone(),
                tenant_id: tenant.clone(),
                customer_id: CustomerId("C-1".to_string()),
                quote_no: "QT20260101".to_string(),
                version: 1,
                status: QuoteStatus::Draft,
                is_active: true,
                parent_quote_id: None,
                root_quote_id: None,
                title: Some("Living room".to_string()),
                total_amount: Decimal::new(123450, 2),
                discount_rate: Some(Decimal::new(9500, 4)),
                discount_amount: Decimal::new(6173, 2),
                final_amount: Decimal::new(117277, 2),
                valid_until: Some(now + chrono::Duration::days(7)),
                notes: None,
                created_by: UserId("U-1".to_string()),
                created_at: now,
                updated_at: now,
            },
            rooms: vec![QuoteRoom {
                id: room_id.clone(),
                tenant_id: tenant.clone(),
                quote_id: quote_id.clone(),
                name: "Living room".to_string(),
                measure_room_id: None,
                sort_order: 0,
                created_at: now,
                updated_at: now,
            }],
            items: vec![QuoteItem {
                id: QuoteItemId("I-1".to_string()),
                tenant_id: tenant.clone(),
                quote_id,
                room_id: Some(room_id),
                parent_id: None,
                category: ProductCategory::CurtainFabric,
                product_id: None,
                product_name: "STRAIGHT".to_string(),
                unit: Some("m".to_string()),
                unit_price: Decimal::new(123450, 2),
                quantity: Decimal::ONE,
                width: Some(Decimal::from(3000)),
                height: Some(Decimal::new(26005, 1)),
                subtotal: Decimal::new(123450, 2),
                attributes: serde_json::json!({ "foldRatio": "2.0" }),
                sort_order: 0,
                created_at: now,
                updated_at: now,
            }],
        }
    }

    #[tokio::test]
    async fn tree_round_trips_with_exact_decimals() {
        let pool = setup().await;
        let tenant = TenantId("T-1".to_string());
        let repo = SqlQuoteRepository::new(pool);
        let tree = sample_tree(&tenant);
        repo.insert_tree(&tree).await.expect("insert");

        let fetched =
            repo.find_tree(&tenant, &tree.quote.id).await.expect("find").expect("tree exists");

        assert_eq!(fetched.quote.total_amount.to_string(), "1234.50");
        assert_eq!(fetched.quote.discount_rate, Some(Decimal::new(9500, 4)));
        assert_eq!(fetched.items[0].height, Some(Decimal::new(26005, 1)));
        assert_eq!(fetched.items[0].attributes["foldRatio"], "2.0");
        assert_eq!(fetched.rooms.len(), 1);
        assert_eq!(fetched.quote.status, QuoteStatus::Draft);
    }

    #[tokio::test]
    async fn reads_are_tenant_scoped() {
        let pool = setup().await;
        let tenant = TenantId("T-1".to_string());
        let repo = SqlQuoteRepository::new(pool);
        let tree = sample_tree(&tenant);
        repo.insert_tree(&tree).await.expect("insert");

        let other = TenantId("T-2".to_string());
        assert!(repo.find_tree(&other, &tree.quote.id).await.expect("find").is_none());
        assert!(repo.list_family(&other, &tree.quote.id).await.expect("family").is_empty());
        assert_eq!(repo.list_family(&tenant, &tree.quote.id).await.expect("family").len(), 1);
    }
}
