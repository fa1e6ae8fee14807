//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the adprovision server:
//! - HTTP request metrics (latency, counts)
//! - Ad product and wizard state (collected dynamically)
//! - Core workflow and remote call metrics (registered from the core crate)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "adprovision_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 60.0, 300.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("adprovision_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "adprovision_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// State Metrics (collected dynamically)
// =============================================================================

/// Stored ad products.
pub static AD_PRODUCTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("adprovision_ad_products", "Number of stored ad products").unwrap()
});

/// Registered bidders.
pub static BIDDERS_REGISTERED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("adprovision_bidders_registered", "Number of registered bidders").unwrap()
});

/// Wizard run in progress (1 = running, 0 = idle).
pub static WIZARD_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "adprovision_wizard_in_flight",
        "Whether a provisioning run is in progress (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // State
    registry.register(Box::new(AD_PRODUCTS.clone())).unwrap();
    registry
        .register(Box::new(BIDDERS_REGISTERED.clone()))
        .unwrap();
    registry
        .register(Box::new(WIZARD_IN_FLIGHT.clone()))
        .unwrap();

    // Core metrics (workflow, remote calls, products)
    for metric in adprovision_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect current values.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(ids) = state.product_store().ids() {
        AD_PRODUCTS.set(ids.len() as i64);
    }

    BIDDERS_REGISTERED.set(state.registry().len() as i64);

    if let Some(wizard) = state.wizard() {
        let running = wizard.current().await.is_in_flight();
        WIZARD_IN_FLIGHT.set(if running { 1 } else { 0 });
    }
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    NUMERIC_SEGMENT.replace_all(path, "/{id}$1").to_string()
}
