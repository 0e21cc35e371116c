use crate::error::{map_constraint_violation, EngineError};
use crate::model::{InventoryItem, MovementType, PageParams, StockMovement};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub(crate) const ITEM_COLUMNS: &str = "id, sku, location, quantity_on_hand, quantity_reserved, \
     (quantity_on_hand - quantity_reserved) AS quantity_available, \
     reorder_point, reorder_quantity, backorderable, metadata, lock_version, \
     created_at, updated_at";

pub(crate) const MOVEMENT_COLUMNS: &str = "id, inventory_item_id, movement_type, quantity, \
     quantity_before, quantity_after, reason, reference_type, reference_id, \
     metadata, created_at";

#[derive(Debug, Clone)]
pub struct NewItem {
    pub sku: String,
    pub location: String,
    pub quantity_on_hand: i32,
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub backorderable: bool,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub backorderable: Option<bool>,
    pub metadata: Option<serde_json::Value>,
    /// When present, the update is rejected with `Conflict` unless the row
    /// still carries this version.
    pub lock_version: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub inventory_item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub reason: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub sku: Option<String>,
    pub location: Option<String>,
    pub in_stock: bool,
    pub low_stock: bool,
    pub out_of_stock: bool,
}

pub async fn get_item(
    pool: &PgPool,
    sku: &str,
    location: &str,
) -> Result<Option<InventoryItem>, sqlx::Error> {
    sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1 AND location = $2"
    ))
    .bind(sku)
    .bind(location)
    .fetch_optional(pool)
    .await
}

/// Blocking row lock; call inside an open transaction.
pub async fn lock_item(
    conn: &mut PgConnection,
    sku: &str,
    location: &str,
) -> Result<Option<InventoryItem>, sqlx::Error> {
    sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1 AND location = $2 FOR UPDATE"
    ))
    .bind(sku)
    .bind(location)
    .fetch_optional(conn)
    .await
}

/// Lock the two rows of a transfer in one statement. `ORDER BY id` makes the
/// lock acquisition order canonical across concurrent transfers, so the wait
/// graph stays acyclic.
pub async fn lock_pair(
    conn: &mut PgConnection,
    sku: &str,
    source_location: &str,
    destination_location: &str,
) -> Result<(Option<InventoryItem>, Option<InventoryItem>), sqlx::Error> {
    let rows = sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items \
         WHERE sku = $1 AND location IN ($2, $3) ORDER BY id FOR UPDATE"
    ))
    .bind(sku)
    .bind(source_location)
    .bind(destination_location)
    .fetch_all(conn)
    .await?;

    let mut source = None;
    let mut destination = None;
    for row in rows {
        if row.location == source_location {
            source = Some(row);
        } else if row.location == destination_location {
            destination = Some(row);
        }
    }
    Ok((source, destination))
}

pub async fn insert_item(pool: &PgPool, item: &NewItem) -> Result<InventoryItem, EngineError> {
    sqlx::query_as::<_, InventoryItem>(&format!(
        "INSERT INTO inventory_items \
             (sku, location, quantity_on_hand, reorder_point, reorder_quantity, backorderable, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(&item.sku)
    .bind(&item.location)
    .bind(item.quantity_on_hand)
    .bind(item.reorder_point)
    .bind(item.reorder_quantity)
    .bind(item.backorderable)
    .bind(&item.metadata)
    .fetch_one(pool)
    .await
    .map_err(map_constraint_violation)
}

/// Optimistic update of the non-quantity fields. Quantity counters are only
/// ever touched by the engine under a row lock.
pub async fn update_settings(
    pool: &PgPool,
    sku: &str,
    location: &str,
    patch: &SettingsPatch,
) -> Result<InventoryItem, EngineError> {
    if get_item(pool, sku, location).await?.is_none() {
        return Err(EngineError::NotFound { sku: sku.into(), location: location.into() });
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "UPDATE inventory_items SET \
         reorder_point = COALESCE(",
    );
    builder.push_bind(patch.reorder_point);
    builder.push(", reorder_point), reorder_quantity = COALESCE(");
    builder.push_bind(patch.reorder_quantity);
    builder.push(", reorder_quantity), backorderable = COALESCE(");
    builder.push_bind(patch.backorderable);
    builder.push(", backorderable), metadata = COALESCE(");
    builder.push_bind(patch.metadata.clone());
    builder.push(", metadata), lock_version = lock_version + 1, updated_at = NOW() WHERE sku = ");
    builder.push_bind(sku.to_string());
    builder.push(" AND location = ");
    builder.push_bind(location.to_string());
    if let Some(expected) = patch.lock_version {
        builder.push(" AND lock_version = ");
        builder.push_bind(expected);
    }
    builder.push(format!(" RETURNING {ITEM_COLUMNS}"));

    let updated = builder
        .build_query_as::<InventoryItem>()
        .fetch_optional(pool)
        .await
        .map_err(map_constraint_violation)?;

    match updated {
        Some(item) => Ok(item),
        // The row existed a moment ago, so a miss means the version guard fired.
        None if patch.lock_version.is_some() => {
            Err(EngineError::Conflict { sku: sku.into(), location: location.into() })
        }
        None => Err(EngineError::NotFound { sku: sku.into(), location: location.into() }),
    }
}

/// Returns true when a row was deleted; movements go with it via cascade.
pub async fn delete_item(pool: &PgPool, sku: &str, location: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM inventory_items WHERE sku = $1 AND location = $2")
        .bind(sku)
        .bind(location)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Write both counters and bump the version; caller holds the row lock.
pub async fn apply_counters(
    conn: &mut PgConnection,
    id: Uuid,
    quantity_on_hand: i32,
    quantity_reserved: i32,
) -> Result<InventoryItem, sqlx::Error> {
    sqlx::query_as::<_, InventoryItem>(&format!(
        "UPDATE inventory_items \
         SET quantity_on_hand = $2, quantity_reserved = $3, \
             lock_version = lock_version + 1, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(id)
    .bind(quantity_on_hand)
    .bind(quantity_reserved)
    .fetch_one(conn)
    .await
}

/// Ledger append. `clock_timestamp()` rather than `NOW()`: the timestamp is
/// taken while the row lock is held, so per-item ledger order matches commit
/// order even when a transaction waited on the lock.
pub async fn insert_movement(
    conn: &mut PgConnection,
    movement: &NewMovement,
) -> Result<StockMovement, sqlx::Error> {
    sqlx::query_as::<_, StockMovement>(&format!(
        "INSERT INTO stock_movements \
             (inventory_item_id, movement_type, quantity, quantity_before, quantity_after, \
              reason, reference_type, reference_id, metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, clock_timestamp()) \
         RETURNING {MOVEMENT_COLUMNS}"
    ))
    .bind(movement.inventory_item_id)
    .bind(movement.movement_type.as_str())
    .bind(movement.quantity)
    .bind(movement.quantity_before)
    .bind(movement.quantity_after)
    .bind(&movement.reason)
    .bind(&movement.reference_type)
    .bind(&movement.reference_id)
    .bind(&movement.metadata)
    .fetch_one(conn)
    .await
}

fn push_item_filters(builder: &mut QueryBuilder<Postgres>, filter: &ListFilter) {
    if let Some(sku) = &filter.sku {
        builder.push(" AND sku = ");
        builder.push_bind(sku.clone());
    }
    if let Some(location) = &filter.location {
        builder.push(" AND location = ");
        builder.push_bind(location.clone());
    }
    if filter.in_stock {
        builder.push(" AND quantity_on_hand - quantity_reserved > 0");
    }
    if filter.out_of_stock {
        builder.push(" AND quantity_on_hand - quantity_reserved <= 0");
    }
    if filter.low_stock {
        builder.push(
            " AND reorder_point IS NOT NULL \
             AND quantity_on_hand - quantity_reserved <= reorder_point",
        );
    }
}

pub async fn list_items(
    pool: &PgPool,
    filter: &ListFilter,
    page: &PageParams,
) -> Result<(Vec<InventoryItem>, i64), sqlx::Error> {
    let mut count: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM inventory_items WHERE TRUE");
    push_item_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE TRUE"));
    push_item_filters(&mut builder, filter);
    builder.push(" ORDER BY sku, location LIMIT ");
    builder.push_bind(page.per_page());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
    let items = builder.build_query_as::<InventoryItem>().fetch_all(pool).await?;

    Ok((items, total))
}

pub async fn distinct_locations(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT location FROM inventory_items ORDER BY location",
    )
    .fetch_all(pool)
    .await
}
