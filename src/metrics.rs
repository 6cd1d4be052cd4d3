//! Prometheus metrics
//!
//! - `ledger_http_requests_total` - requests by method, route and status
//! - `ledger_http_request_duration_seconds` - request latency by method and route
//! - `ledger_transfers_committed_total` - committed double-entry transfers
//! - `ledger_transfer_conflicts_total` - concurrency conflicts hit by transfers
//! - `ledger_transfers_retries_exhausted_total` - transfers that ran out of attempts

use std::fmt;

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, HistogramOpts, HistogramVec, IntCounter,
    IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metrics collector with its own registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,

    pub transfers_committed: IntCounter,
    pub transfer_conflicts: IntCounter,
    pub transfers_retries_exhausted: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = register_int_counter_vec_with_registry!(
            Opts::new("ledger_http_requests_total", "Total HTTP requests processed"),
            &["method", "path", "status"],
            registry
        )?;

        let http_request_duration_seconds = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "ledger_http_request_duration_seconds",
                "HTTP request duration in seconds"
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
            registry
        )?;

        let transfers_committed = register_int_counter_with_registry!(
            Opts::new("ledger_transfers_committed_total", "Committed double-entry transfers"),
            registry
        )?;

        let transfer_conflicts = register_int_counter_with_registry!(
            Opts::new(
                "ledger_transfer_conflicts_total",
                "Concurrency conflicts hit while appending transfers"
            ),
            registry
        )?;

        let transfers_retries_exhausted = register_int_counter_with_registry!(
            Opts::new(
                "ledger_transfers_retries_exhausted_total",
                "Transfers abandoned after exhausting their attempts"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            transfers_committed,
            transfer_conflicts,
            transfers_retries_exhausted,
        })
    }

    /// Record a served HTTP request
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_seconds: f64) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_seconds);
    }

    pub fn record_transfer_committed(&self) {
        self.transfers_committed.inc();
    }

    pub fn record_transfer_conflict(&self) {
        self.transfer_conflicts.inc();
    }

    pub fn record_retries_exhausted(&self) {
        self.transfers_retries_exhausted.inc();
    }

    /// Content type of [`Metrics::render`] output
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
