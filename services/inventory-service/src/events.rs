use crate::model::{InventoryItem, StockMovement};
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// Payload published after a committed transition.
#[derive(Debug, Clone, Serialize)]
pub struct StockEvent {
    pub event_type: &'static str,
    pub sku: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_type: Option<String>,
    pub quantity: i32,
}

impl StockEvent {
    pub fn movement(item: &InventoryItem, movement: &StockMovement) -> Self {
        StockEvent {
            event_type: "stock.movement",
            sku: item.sku.clone(),
            location: item.location.clone(),
            movement_id: Some(movement.id),
            movement_type: Some(movement.movement_type.clone()),
            quantity: movement.quantity,
        }
    }

    pub fn low_stock(item: &InventoryItem) -> Self {
        StockEvent {
            event_type: "stock.low_stock",
            sku: item.sku.clone(),
            location: item.location.clone(),
            movement_id: None,
            movement_type: None,
            quantity: item.quantity_available,
        }
    }
}

/// Post-commit publication seam. Implementations must be best-effort: the
/// engine logs and counts a failed publish but never unwinds the committed
/// transition.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &StockEvent) -> anyhow::Result<()>;
}

/// Default sink: structured JSON through the log pipeline.
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(&self, event: &StockEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        tracing::info!(
            target: "stock_events",
            event_type = event.event_type,
            sku = %event.sku,
            location = %event.location,
            %payload,
            "stock event"
        );
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaEventSink;

#[cfg(feature = "kafka")]
mod kafka {
    use super::{EventSink, StockEvent};
    use async_trait::async_trait;
    use rdkafka::producer::{FutureProducer, FutureRecord};

    pub struct KafkaEventSink {
        producer: FutureProducer,
        topic: String,
    }

    impl KafkaEventSink {
        pub fn from_env() -> anyhow::Result<Self> {
            let producer: FutureProducer = rdkafka::ClientConfig::new()
                .set(
                    "bootstrap.servers",
                    std::env::var("KAFKA_BOOTSTRAP").unwrap_or_else(|_| "localhost:9092".into()),
                )
                .create()?;
            let topic =
                std::env::var("STOCK_EVENTS_TOPIC").unwrap_or_else(|_| "stock.events".into());
            Ok(KafkaEventSink { producer, topic })
        }
    }

    #[async_trait]
    impl EventSink for KafkaEventSink {
        async fn publish(&self, event: &StockEvent) -> anyhow::Result<()> {
            let payload = serde_json::to_string(event)?;
            self.producer
                .send(
                    FutureRecord::to(&self.topic).payload(&payload).key(&event.sku),
                    std::time::Duration::from_secs(0),
                )
                .await
                .map_err(|(err, _)| anyhow::anyhow!("kafka publish failed: {err}"))?;
            Ok(())
        }
    }
}

/// Returns true when an item should raise a low-stock alert.
///
/// All three must hold: a reorder point is configured, available stock is at
/// or below it, and the suggested reorder quantity is positive.
#[inline]
pub fn reorder_triggered(item: &InventoryItem) -> bool {
    match (item.reorder_point, item.reorder_quantity) {
        (Some(point), Some(reorder_quantity)) => {
            reorder_quantity > 0 && item.quantity_available <= point
        }
        _ => false,
    }
}
