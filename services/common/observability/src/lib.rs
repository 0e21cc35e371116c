use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};

#[derive(Clone)]
pub struct InventoryMetrics {
    pub registry: Registry,
    pub stock_transitions: IntCounterVec,
    pub transition_failures: IntCounterVec,
    pub event_publish_failures: IntCounter,
    pub low_stock_alerts: IntCounter,
    pub transition_duration_seconds: Histogram,
}

impl InventoryMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let stock_transitions = IntCounterVec::new(
            prometheus::Opts::new(
                "inventory_stock_transitions_total",
                "Committed stock transitions by movement type",
            ),
            &["movement_type"],
        ).unwrap();
        let transition_failures = IntCounterVec::new(
            prometheus::Opts::new(
                "inventory_transition_failures_total",
                "Rejected stock transitions by error kind",
            ),
            &["kind"],
        ).unwrap();
        let event_publish_failures = IntCounter::new(
            "inventory_event_publish_failures_total",
            "Post-commit events that failed to publish",
        ).unwrap();
        let low_stock_alerts = IntCounter::new(
            "inventory_low_stock_alerts_total",
            "Low-stock events emitted after a transition",
        ).unwrap();
        let transition_duration_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "inventory_transition_duration_seconds",
                "Wall time of a stock transition transaction",
            ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0]),
        ).unwrap();
        let _ = registry.register(Box::new(stock_transitions.clone()));
        let _ = registry.register(Box::new(transition_failures.clone()));
        let _ = registry.register(Box::new(event_publish_failures.clone()));
        let _ = registry.register(Box::new(low_stock_alerts.clone()));
        let _ = registry.register(Box::new(transition_duration_seconds.clone()));
        InventoryMetrics {
            registry,
            stock_transitions,
            transition_failures,
            event_publish_failures,
            low_stock_alerts,
            transition_duration_seconds,
        }
    }
}

impl Default for InventoryMetrics {
    fn default() -> Self { Self::new() }
}
