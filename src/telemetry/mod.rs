//! Telemetry
//!
//! Metrics for gateway operations. Log output goes through the `tracing`
//! crate; installing a subscriber is up to the host application.

pub mod metrics;

pub use metrics::{
    create_in_memory_metrics, no_op_metrics, GatewayMetrics, InMemoryMetrics, MetricEntry,
    MetricLabels, NoOpMetrics,
};
