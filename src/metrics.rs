//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `parameter_sync_reconciliations_total` - Total number of reconciliations
//! - `parameter_sync_reconciliation_errors_total` - Total number of reconciliation errors
//! - `parameter_sync_reconciliation_duration_seconds` - Duration of reconciliation operations
//! - `parameter_sync_parameters_synced_total` - Total number of parameters written to Secrets
//! - `parameter_sync_store_operation_duration_seconds` - Duration of Parameter Store calls, by operation

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "parameter_sync_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "parameter_sync_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "parameter_sync_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static PARAMETERS_SYNCED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "parameter_sync_parameters_synced_total",
        "Total number of parameters written to Secrets",
    )
    .expect("Failed to create PARAMETERS_SYNCED_TOTAL metric - this should never happen")
});

static STORE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "parameter_sync_store_operation_duration_seconds",
            "Duration of Parameter Store operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION metric - this should never happen")
});

/// Register all metrics with the controller registry.
///
/// Must be called once at startup, before the metrics endpoint is served.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(PARAMETERS_SYNCED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATION_DURATION.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(seconds: f64) {
    RECONCILIATION_DURATION.observe(seconds);
}

pub fn increment_parameters_synced(count: i64) {
    if count > 0 {
        PARAMETERS_SYNCED_TOTAL.inc_by(count.unsigned_abs());
    }
}

pub fn record_store_operation(operation: &str, seconds: f64) {
    STORE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(seconds);
}
