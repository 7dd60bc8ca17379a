//! Prometheus metrics for heap pool operations
//!
//! Counters are process-wide and shared by every pool instance.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nodeheap_operations_total", "Total number of pool operations"),
        &["op", "status"]
    ).unwrap();

    pub static ref BYTES_WRITTEN: IntCounter = IntCounter::new(
        "nodeheap_bytes_written_total",
        "Total bytes moved into nodes"
    ).unwrap();

    pub static ref BYTES_RELEASED: IntCounter = IntCounter::new(
        "nodeheap_bytes_released_total",
        "Total bytes released from nodes"
    ).unwrap();
}

/// Register all pool metrics with the global registry
pub fn init_metrics() {
    info!("Initializing pool metrics");

    METRICS_REGISTRY.register(Box::new(OPERATIONS_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(BYTES_WRITTEN.clone())).ok();
    METRICS_REGISTRY.register(Box::new(BYTES_RELEASED.clone())).ok();
}

/// Count one operation outcome
pub fn record<T, E>(op: &str, result: &std::result::Result<T, E>) {
    let status = if result.is_ok() { "ok" } else { "error" };
    OPERATIONS_TOTAL.with_label_values(&[op, status]).inc();
}

pub fn record_written(len: usize) {
    BYTES_WRITTEN.inc_by(len as u64);
}

pub fn record_released(len: usize) {
    if len > 0 {
        BYTES_RELEASED.inc_by(len as u64);
    }
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("# Error converting metrics\n"))
}
