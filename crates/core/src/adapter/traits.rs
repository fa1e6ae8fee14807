//! Trait definitions for the ad-server adapter.

use async_trait::async_trait;

use super::error::AdapterError;
use super::types::{CreateRequest, LicaConfig, OrderId, OrderState};
use crate::bidders::Bidder;

/// Client for the remote ad server that provisions GAM entities.
#[async_trait]
pub trait AdServerAdapter: Send + Sync {
    /// Returns the name of this adapter implementation.
    fn name(&self) -> &str;

    /// Creates an order, its line items, or one batch of creative associations.
    ///
    /// Returns the cumulative order state after the call.
    async fn create(&self, request: CreateRequest) -> Result<OrderState, AdapterError>;

    /// Fetches every line item / creative association the order needs.
    async fn lica_config(&self, order_id: OrderId) -> Result<LicaConfig, AdapterError>;

    /// Fetches the current state of an order.
    async fn order(&self, order_id: OrderId) -> Result<OrderState, AdapterError>;

    /// Fetches the bidders known to the server.
    async fn bidders(&self) -> Result<Vec<Bidder>, AdapterError>;

    /// Archives an order that can no longer be completed.
    async fn archive_order(&self, order_id: OrderId) -> Result<(), AdapterError>;
}
