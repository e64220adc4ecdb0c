/// Metrics Module - Prometheus Instrumentation
///
/// - Prometheus registry with the service's counters, gauges and histograms
/// - Helper API so call sites never touch label vectors directly
/// - Standard latency buckets for request-path histograms

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Once;
use std::time::Instant;

/// Standard latency buckets for histograms (seconds)
const LATENCY_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// HTTP requests
    /// Labels: endpoint (matched route), method, status
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("rustyinsight_http_requests_total", "Total HTTP requests"),
        &["endpoint", "method", "status"]
    ).unwrap();

    /// Time spent building a response view
    /// Labels: flow (address, transaction, tx_listing, utxo, blocks, block)
    pub static ref ENRICHMENT_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "rustyinsight_enrichment_duration_seconds",
            "Latency of view aggregation by flow"
        )
            .buckets(LATENCY_BUCKETS.to_vec()),
        &["flow"]
    ).unwrap();

    /// Reverse spend index lookups
    /// Labels: result (spent, unspent, index_mismatch)
    pub static ref SPENT_LOOKUPS: IntCounterVec = IntCounterVec::new(
        Opts::new("rustyinsight_spent_lookups_total", "Output spend-status lookups by result"),
        &["result"]
    ).unwrap();

    /// Node data that contradicts itself
    /// Labels: kind (negative_fee, utxo_address_mismatch)
    pub static ref INVARIANT_VIOLATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "rustyinsight_invariant_violations_total",
            "Data-integrity anomalies observed in node answers"
        ),
        &["kind"]
    ).unwrap();

    /// Best height last reported by the node
    pub static ref CHAIN_TIP_HEIGHT: IntGauge = IntGauge::new(
        "rustyinsight_chain_tip_height",
        "Chain tip height as seen by the API"
    ).unwrap();
}

/// Register every metric with the global registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = register_all();
    });
    result
}

fn register_all() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(HTTP_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(ENRICHMENT_DURATION.clone()))?;
    REGISTRY.register(Box::new(SPENT_LOOKUPS.clone()))?;
    REGISTRY.register(Box::new(INVARIANT_VIOLATIONS.clone()))?;
    REGISTRY.register(Box::new(CHAIN_TIP_HEIGHT.clone()))?;
    Ok(())
}

/// Gather metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Timer for measuring durations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn increment_http_requests(endpoint: &str, method: &str, status: u16) {
    let status = status.to_string();
    HTTP_REQUESTS
        .with_label_values(&[endpoint, method, status.as_str()])
        .inc();
}

pub fn record_enrichment_duration(flow: &str, duration_secs: f64) {
    ENRICHMENT_DURATION.with_label_values(&[flow]).observe(duration_secs);
}

pub fn increment_spent_lookups(result: &str) {
    SPENT_LOOKUPS.with_label_values(&[result]).inc();
}

pub fn increment_invariant_violations(kind: &str) {
    INVARIANT_VIOLATIONS.with_label_values(&[kind]).inc();
}

pub fn set_chain_tip_height(height: i64) {
    CHAIN_TIP_HEIGHT.set(height);
}
