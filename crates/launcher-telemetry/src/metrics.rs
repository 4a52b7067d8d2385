//! Prometheus metrics for the token launcher.
//!
//! All metrics follow the naming convention: `tl_<component>_<metric>_<unit>`
//!
//! Router counters live inside the router's pending-call table. They are
//! mirrored into gauges here with [`record_router_stats`] before encoding.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

use crate::TelemetryError;

/// Buckets for worker operations, from a quick account lookup to a slow proof.
const OPERATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0,
];

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CALL ROUTER
    // =========================================================================

    /// Router call counts by state (registered, resolved, rejected, timeouts, ...)
    pub static ref ROUTER_CALLS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tl_router_calls", "Router call counts by state"),
        &["state"]
    ).expect("metric creation failed");

    /// Calls currently awaiting a response
    pub static ref ROUTER_PENDING: IntGauge = IntGauge::new(
        "tl_router_pending_calls",
        "Calls awaiting a response from the worker"
    ).expect("metric creation failed");

    // =========================================================================
    // CONTRACT WORKER
    // =========================================================================

    /// Operations executed by the worker
    pub static ref WORKER_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("tl_worker_operations_total", "Operations executed by the contract worker"),
        &["operation", "outcome"]  // outcome: ok/error
    ).expect("metric creation failed");

    /// Time spent executing an operation
    pub static ref WORKER_OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tl_worker_operation_duration_seconds",
            "Time spent executing a contract worker operation"
        ).buckets(OPERATION_BUCKETS.to_vec()),
        &["operation"]
    ).expect("metric creation failed");

    /// Indexer requests by network and outcome
    pub static ref INDEXER_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("tl_indexer_requests_total", "GraphQL indexer requests"),
        &["network", "outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // WALLET AND REGISTRY
    // =========================================================================

    /// Transactions handed to the wallet
    pub static ref WALLET_BROADCASTS: IntCounterVec = IntCounterVec::new(
        Opts::new("tl_wallet_broadcasts_total", "Transactions submitted through the wallet"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Tokens in the local registry
    pub static ref TOKENS_STORED: IntGauge = IntGauge::new(
        "tl_registry_tokens",
        "Tokens held in the local registry"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ROUTER_CALLS.clone()),
        Box::new(ROUTER_PENDING.clone()),
        Box::new(WORKER_OPERATIONS.clone()),
        Box::new(WORKER_OPERATION_DURATION.clone()),
        Box::new(INDEXER_REQUESTS.clone()),
        Box::new(WALLET_BROADCASTS.clone()),
        Box::new(TOKENS_STORED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Mirror router counters into [`ROUTER_CALLS`] and [`ROUTER_PENDING`].
///
/// Takes `(state, count)` pairs so this crate does not depend on the router.
pub fn record_router_stats<'a>(counts: impl IntoIterator<Item = (&'a str, u64)>, pending: usize) {
    for (state, count) in counts {
        ROUTER_CALLS
            .with_label_values(&[state])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
    ROUTER_PENDING.set(i64::try_from(pending).unwrap_or(i64::MAX));
}

/// Count one worker operation.
pub fn record_operation(operation: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    WORKER_OPERATIONS
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Timer guard for worker operation duration. Observation happens on drop.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        WORKER_OPERATION_DURATION
            .with_label_values(&[self.operation])
            .observe(self.start.elapsed().as_secs_f64());
    }
}
