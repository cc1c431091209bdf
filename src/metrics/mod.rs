mod server;

use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::domain::CustomerStatus;

pub use server::start_metrics_server;

// ============================================================================
// Metrics - Prometheus instrumentation
// ============================================================================
//
// Counters and latency histograms for the customer lifecycle operations,
// optimistic-lock conflicts, and status transitions. Registered against one
// registry and scraped via /metrics.
//
// ============================================================================

/// Central metrics registry for the service core.
pub struct Metrics {
    registry: Registry,

    pub operations_total: IntCounterVec,
    pub operation_duration: HistogramVec,
    pub lock_conflicts_total: IntCounterVec,
    pub status_transitions_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "customer_operations_total",
                "Customer operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "customer_operation_duration_seconds",
                "Customer operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let lock_conflicts_total = IntCounterVec::new(
            Opts::new(
                "customer_lock_conflicts_total",
                "Optimistic-lock conflicts by operation",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(lock_conflicts_total.clone()))?;

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "customer_status_transitions_total",
                "Status transitions by edge",
            ),
            &["from_status", "to_status"],
        )?;
        registry.register(Box::new(status_transitions_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operation_duration,
            lock_conflicts_total,
            status_transitions_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation(&self, operation: &str, duration: Duration, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    pub fn record_conflict(&self, operation: &str) {
        self.lock_conflicts_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_status_transition(&self, from: CustomerStatus, to: CustomerStatus) {
        self.status_transitions_total
            .with_label_values(&[&from.to_string(), &to.to_string()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("create_customer", Duration::from_millis(3), true);
        metrics.record_operation("create_customer", Duration::from_millis(9), false);

        let gathered = metrics.registry.gather();
        let operations = gathered
            .iter()
            .find(|m| m.name() == "customer_operations_total")
            .unwrap();
        assert_eq!(operations.metric.len(), 2);
    }

    #[test]
    fn test_record_conflict() {
        let metrics = Metrics::new().unwrap();
        metrics.record_conflict("update_customer");
        metrics.record_conflict("update_customer");

        let gathered = metrics.registry.gather();
        let conflicts = gathered
            .iter()
            .find(|m| m.name() == "customer_lock_conflicts_total")
            .unwrap();
        assert_eq!(conflicts.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_status_transition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_status_transition(CustomerStatus::Pending, CustomerStatus::Active);

        let gathered = metrics.registry.gather();
        let transitions = gathered
            .iter()
            .find(|m| m.name() == "customer_status_transitions_total")
            .unwrap();
        assert_eq!(transitions.metric[0].counter.value, Some(1.0));
    }
}
