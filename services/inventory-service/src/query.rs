use crate::model::{InventoryItem, MovementType, PageParams, StockMovement};
use crate::store::{self, ListFilter, ITEM_COLUMNS, MOVEMENT_COLUMNS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// All items for a SKU across locations.
pub async fn by_sku(pool: &PgPool, sku: &str) -> Result<Vec<InventoryItem>, sqlx::Error> {
    sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1 ORDER BY location"
    ))
    .bind(sku)
    .fetch_all(pool)
    .await
}

/// Items whose available stock sits at or below their reorder point.
pub async fn low_stock(
    pool: &PgPool,
    page: &PageParams,
) -> Result<(Vec<InventoryItem>, i64), sqlx::Error> {
    store::list_items(pool, &ListFilter { low_stock: true, ..Default::default() }, page).await
}

pub async fn in_stock(
    pool: &PgPool,
    page: &PageParams,
) -> Result<(Vec<InventoryItem>, i64), sqlx::Error> {
    store::list_items(pool, &ListFilter { in_stock: true, ..Default::default() }, page).await
}

pub async fn out_of_stock(
    pool: &PgPool,
    page: &PageParams,
) -> Result<(Vec<InventoryItem>, i64), sqlx::Error> {
    store::list_items(pool, &ListFilter { out_of_stock: true, ..Default::default() }, page).await
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    /// Set to scope the listing to one item's ledger.
    pub inventory_item_id: Option<Uuid>,
}

fn push_movement_filters(builder: &mut QueryBuilder<Postgres>, filter: &MovementFilter) {
    if let Some(item_id) = filter.inventory_item_id {
        builder.push(" AND inventory_item_id = ");
        builder.push_bind(item_id);
    }
    if let Some(movement_type) = filter.movement_type {
        builder.push(" AND movement_type = ");
        builder.push_bind(movement_type.as_str());
    }
    if let Some(start) = filter.start_date {
        builder.push(" AND created_at >= ");
        builder.push_bind(start);
    }
    if let Some(end) = filter.end_date {
        builder.push(" AND created_at <= ");
        builder.push_bind(end);
    }
    if let Some(reference_type) = &filter.reference_type {
        builder.push(" AND reference_type = ");
        builder.push_bind(reference_type.clone());
    }
    if let Some(reference_id) = &filter.reference_id {
        builder.push(" AND reference_id = ");
        builder.push_bind(reference_id.clone());
    }
}

/// Paginated ledger browsing, newest first.
pub async fn list_movements(
    pool: &PgPool,
    filter: &MovementFilter,
    page: &PageParams,
) -> Result<(Vec<StockMovement>, i64), sqlx::Error> {
    let mut count: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM stock_movements WHERE TRUE");
    push_movement_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE TRUE"));
    push_movement_filters(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(page.per_page());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
    let movements = builder.build_query_as::<StockMovement>().fetch_all(pool).await?;

    Ok((movements, total))
}

/// One item's ledger with the same filters.
pub async fn movements_for(
    pool: &PgPool,
    inventory_item_id: Uuid,
    filter: &MovementFilter,
    page: &PageParams,
) -> Result<(Vec<StockMovement>, i64), sqlx::Error> {
    let scoped = MovementFilter { inventory_item_id: Some(inventory_item_id), ..filter.clone() };
    list_movements(pool, &scoped, page).await
}

pub async fn get_movement(pool: &PgPool, id: Uuid) -> Result<Option<StockMovement>, sqlx::Error> {
    sqlx::query_as::<_, StockMovement>(&format!(
        "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationAvailability {
    pub location: String,
    pub quantity_on_hand: i32,
    pub quantity_reserved: i32,
    pub quantity_available: i32,
    pub backorderable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub sku: String,
    pub requested: i32,
    pub total_available: i64,
    pub is_available: bool,
    pub backorderable: bool,
    pub per_location: Vec<LocationAvailability>,
}

#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub sku: String,
    pub quantity: i32,
    pub location: Option<String>,
}

/// Availability summed across the matching items. A single backorderable
/// location makes the request fulfillable regardless of the totals.
pub async fn check_availability(
    pool: &PgPool,
    sku: &str,
    quantity: i32,
    location: Option<&str>,
) -> Result<AvailabilityReport, sqlx::Error> {
    let items = match location {
        Some(location) => {
            store::get_item(pool, sku, location).await?.into_iter().collect::<Vec<_>>()
        }
        None => by_sku(pool, sku).await?,
    };

    let total_available: i64 = items.iter().map(|i| i64::from(i.quantity_available)).sum();
    let backorderable = items.iter().any(|i| i.backorderable);
    let per_location = items
        .into_iter()
        .map(|i| LocationAvailability {
            location: i.location,
            quantity_on_hand: i.quantity_on_hand,
            quantity_reserved: i.quantity_reserved,
            quantity_available: i.quantity_available,
            backorderable: i.backorderable,
        })
        .collect();

    Ok(AvailabilityReport {
        sku: sku.to_string(),
        requested: quantity,
        total_available,
        is_available: total_available >= i64::from(quantity) || backorderable,
        backorderable,
        per_location,
    })
}

pub async fn check_bulk_availability(
    pool: &PgPool,
    queries: &[AvailabilityQuery],
) -> Result<Vec<AvailabilityReport>, sqlx::Error> {
    let mut reports = Vec::with_capacity(queries.len());
    for query in queries {
        reports.push(
            check_availability(pool, &query.sku, query.quantity, query.location.as_deref())
                .await?,
        );
    }
    Ok(reports)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SkuAggregate {
    pub sku: String,
    pub total_on_hand: i64,
    pub total_reserved: i64,
    pub total_available: i64,
}

pub async fn aggregate_by_sku(pool: &PgPool) -> Result<Vec<SkuAggregate>, sqlx::Error> {
    sqlx::query_as::<_, SkuAggregate>(
        "SELECT sku, \
                SUM(quantity_on_hand) AS total_on_hand, \
                SUM(quantity_reserved) AS total_reserved, \
                SUM(quantity_on_hand - quantity_reserved) AS total_available \
         FROM inventory_items GROUP BY sku ORDER BY sku",
    )
    .fetch_all(pool)
    .await
}

pub async fn total_available_for_sku(pool: &PgPool, sku: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity_on_hand - quantity_reserved), 0) \
         FROM inventory_items WHERE sku = $1",
    )
    .bind(sku)
    .fetch_one(pool)
    .await
}
