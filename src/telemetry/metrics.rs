//! Metrics
//!
//! Gateway metrics collection interfaces and implementations.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

/// Gateway metrics interface.
pub trait GatewayMetrics: Send + Sync {
    /// Record an outbound request and the status it received.
    fn record_request(&self, method: &str, status: u16);

    /// Record a 401 observed by the dispatcher.
    fn record_auth_failure(&self, retried: bool);

    /// Record a completed renewal call.
    fn record_renewal(&self, success: bool);

    /// Record a caller that joined an in-flight renewal.
    fn record_renewal_joined(&self);

    /// Record a replayed request.
    fn record_replay(&self, success: bool);

    /// Record a session invalidation.
    fn record_session_invalidated(&self, reason: &str);

    /// Record request duration.
    fn record_request_duration(&self, method: &str, duration_ms: f64);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl GatewayMetrics for NoOpMetrics {
    fn record_request(&self, _method: &str, _status: u16) {}
    fn record_auth_failure(&self, _retried: bool) {}
    fn record_renewal(&self, _success: bool) {}
    fn record_renewal_joined(&self) {}
    fn record_replay(&self, _success: bool) {}
    fn record_session_invalidated(&self, _reason: &str) {}
    fn record_request_duration(&self, _method: &str, _duration_ms: f64) {}
}

/// No-op metrics singleton.
pub fn no_op_metrics() -> NoOpMetrics {
    NoOpMetrics
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
    pub timestamp: u64,
}

/// In-memory metrics for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Count entries with `name` whose labels include `key=value`.
    pub fn count_with_label(&self, name: &str, key: &str, value: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.name == name && e.labels.get(key).map(String::as_str) == Some(value))
            .count()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn record(&self, name: &str, value: f64, labels: MetricLabels) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        self.entries.lock().push(MetricEntry {
            name: name.to_string(),
            value,
            labels,
            timestamp: now,
        });
    }
}

fn labels(pairs: &[(&str, String)]) -> MetricLabels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl GatewayMetrics for InMemoryMetrics {
    fn record_request(&self, method: &str, status: u16) {
        self.record(
            "gateway_requests_total",
            1.0,
            labels(&[("method", method.to_string()), ("status", status.to_string())]),
        );
    }

    fn record_auth_failure(&self, retried: bool) {
        self.record(
            "gateway_auth_failures_total",
            1.0,
            labels(&[("retried", retried.to_string())]),
        );
    }

    fn record_renewal(&self, success: bool) {
        self.record(
            "gateway_renewals_total",
            1.0,
            labels(&[("success", success.to_string())]),
        );
    }

    fn record_renewal_joined(&self) {
        self.record("gateway_renewal_waiters_total", 1.0, MetricLabels::new());
    }

    fn record_replay(&self, success: bool) {
        self.record(
            "gateway_replays_total",
            1.0,
            labels(&[("success", success.to_string())]),
        );
    }

    fn record_session_invalidated(&self, reason: &str) {
        self.record(
            "gateway_session_invalidations_total",
            1.0,
            labels(&[("reason", reason.to_string())]),
        );
    }

    fn record_request_duration(&self, method: &str, duration_ms: f64) {
        self.record(
            "gateway_request_duration_ms",
            duration_ms,
            labels(&[("method", method.to_string())]),
        );
    }
}

/// Create in-memory metrics for testing.
pub fn create_in_memory_metrics() -> InMemoryMetrics {
    InMemoryMetrics::new()
}
