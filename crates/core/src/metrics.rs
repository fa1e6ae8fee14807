//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Provisioning workflow runs and their outcome
//! - Remote ad-server calls
//! - Ad product sanitization

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Workflow Metrics
// =============================================================================

/// Workflow runs total by result.
pub static WORKFLOW_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("adprovision_workflow_runs_total", "Total provisioning runs"),
        &["result"], // "completed", "recoverable", "unrecoverable", "invalid", "rejected"
    )
    .unwrap()
});

/// Workflow run duration in seconds.
pub static WORKFLOW_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "adprovision_workflow_duration_seconds",
            "Duration of provisioning runs",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 180.0, 300.0, 600.0, 900.0]),
        &["result"],
    )
    .unwrap()
});

/// Creative association batches created.
pub static LICA_BATCHES_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "adprovision_lica_batches_created_total",
        "Total creative association batches created",
    )
    .unwrap()
});

// =============================================================================
// Remote Ad Server Metrics
// =============================================================================

/// Remote calls total by call and result.
pub static REMOTE_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("adprovision_remote_calls_total", "Total remote ad server calls"),
        &["call", "result"], // result: "ok", "error"
    )
    .unwrap()
});

/// Remote call duration in seconds.
pub static REMOTE_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "adprovision_remote_call_duration_seconds",
            "Duration of remote ad server calls",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["call"],
    )
    .unwrap()
});

// =============================================================================
// Product Metrics
// =============================================================================

/// Size entries dropped by sanitization.
pub static SIZES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "adprovision_product_sizes_dropped_total",
        "Invalid size entries dropped while sanitizing ad products",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Workflow
        Box::new(WORKFLOW_RUNS.clone()),
        Box::new(WORKFLOW_DURATION.clone()),
        Box::new(LICA_BATCHES_CREATED.clone()),
        // Remote
        Box::new(REMOTE_CALLS.clone()),
        Box::new(REMOTE_CALL_DURATION.clone()),
        // Products
        Box::new(SIZES_DROPPED.clone()),
    ]
}
