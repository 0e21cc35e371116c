pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod inventory_handlers;
pub mod model;
pub mod movement_handlers;
pub mod query;
pub mod rpc;
pub mod store;

pub mod proto {
    tonic::include_proto!("inventory.v1");
}

pub use crate::engine::StockEngine;
pub use crate::error::EngineError;
pub use crate::events::{EventSink, LogEventSink};

use common_observability::InventoryMetrics;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub engine: StockEngine,
    pub metrics: Arc<InventoryMetrics>,
}

impl AppState {
    pub fn new(db: PgPool, sink: Arc<dyn EventSink>) -> Self {
        let metrics = Arc::new(InventoryMetrics::new());
        let engine = StockEngine::new(db.clone(), sink, metrics.clone());
        AppState { db, engine, metrics }
    }
}
