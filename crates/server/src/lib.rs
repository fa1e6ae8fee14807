//! HTTP server for ad product management and order provisioning.

pub mod api;
pub mod metrics;
pub mod state;
pub mod wizard;
