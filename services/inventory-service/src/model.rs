use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Location assumed when a caller does not name one.
pub const DEFAULT_LOCATION: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Receipt,
    Sale,
    Adjustment,
    TransferIn,
    TransferOut,
    Reservation,
    Release,
    Commit,
    Return,
    Damage,
    Loss,
    Found,
    CountAdjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Receipt => "receipt",
            MovementType::Sale => "sale",
            MovementType::Adjustment => "adjustment",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Reservation => "reservation",
            MovementType::Release => "release",
            MovementType::Commit => "commit",
            MovementType::Return => "return",
            MovementType::Damage => "damage",
            MovementType::Loss => "loss",
            MovementType::Found => "found",
            MovementType::CountAdjustment => "count_adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<MovementType> {
        match s {
            "receipt" => Some(MovementType::Receipt),
            "sale" => Some(MovementType::Sale),
            "adjustment" => Some(MovementType::Adjustment),
            "transfer_in" => Some(MovementType::TransferIn),
            "transfer_out" => Some(MovementType::TransferOut),
            "reservation" => Some(MovementType::Reservation),
            "release" => Some(MovementType::Release),
            "commit" => Some(MovementType::Commit),
            "return" => Some(MovementType::Return),
            "damage" => Some(MovementType::Damage),
            "loss" => Some(MovementType::Loss),
            "found" => Some(MovementType::Found),
            "count_adjustment" => Some(MovementType::CountAdjustment),
            _ => None,
        }
    }
}

/// A (sku, location) pair with its quantity counters.
///
/// `quantity_available` is derived in SQL (`on_hand - reserved`) so every
/// fetch carries it without a second round trip.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: Uuid,
    pub sku: String,
    pub location: String,
    pub quantity_on_hand: i32,
    pub quantity_reserved: i32,
    pub quantity_available: i32,
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub backorderable: bool,
    pub metadata: serde_json::Value,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Reservations may exceed available stock only on backorderable items.
    pub fn can_reserve(&self, quantity: i32) -> bool {
        self.backorderable || self.quantity_available >= quantity
    }

    /// Outbound stock (transfer, negative adjust) follows the same rule.
    pub fn can_fulfill(&self, quantity: i32) -> bool {
        self.backorderable || self.quantity_available >= quantity
    }

    pub fn in_stock(&self) -> bool {
        self.quantity_available > 0
    }
}

/// Immutable ledger entry; one row per change to one item.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub movement_type: String,
    pub quantity: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub reason: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied audit context shared by all transitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementContext {
    pub reason: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl MovementContext {
    /// Metadata object for the emitted movement; non-object values are wrapped
    /// rather than rejected since the field is schemaless.
    pub fn metadata_object(&self) -> serde_json::Map<String, serde_json::Value> {
        match &self.metadata {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
            None => serde_json::Map::new(),
        }
    }
}

/// Offset pagination inputs, clamped server-side.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    pub const DEFAULT_PER_PAGE: i64 = 25;
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub total_count: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total_count: i64, params: &PageParams) -> Self {
        let per_page = params.per_page();
        PageMeta {
            total_count,
            page: params.page(),
            per_page,
            total_pages: (total_count + per_page - 1) / per_page,
        }
    }
}
