//! Wire and domain types shared by the adapter and the provisioning workflow.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bidders::BidderRegistry;

/// GAM order identifier.
pub type OrderId = u64;

/// GAM line item identifier.
pub type LineItemId = u64;

/// GAM creative identifier.
pub type CreativeId = u64;

/// Highest revenue share accepted for an order, in percent.
pub const MAX_REVENUE_SHARE: u8 = 100;

/// Reasons an [`OrderConfig`] is rejected before submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderConfigError {
    #[error("order name cannot be empty")]
    EmptyName,

    #[error("revenue share must be between 0 and 100, got {0}")]
    RevenueShareOutOfRange(u8),

    #[error("unknown bidder: {0}")]
    UnknownBidder(String),
}

/// User-entered order configuration, built incrementally before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Remote order id, adopted as soon as the order exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    /// Order name as shown in GAM.
    pub name: String,
    /// Publisher revenue share in percent (0-100).
    #[serde(default)]
    pub revenue_share: u8,
    /// Keys of the bidders the order targets.
    #[serde(default)]
    pub bidders: BTreeSet<String>,
}

impl OrderConfig {
    /// Builds a validated configuration for a new order.
    pub fn new<I, S>(
        name: impl Into<String>,
        revenue_share: u8,
        bidders: I,
    ) -> Result<Self, OrderConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = Self {
            order_id: None,
            name: name.into(),
            revenue_share,
            bidders: bidders.into_iter().map(Into::into).collect(),
        };
        config.validate(None)?;
        Ok(config)
    }

    /// Returns the same configuration pointing at an existing order.
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Checks the configuration, optionally against a bidder registry.
    pub fn validate(&self, registry: Option<&BidderRegistry>) -> Result<(), OrderConfigError> {
        if self.name.trim().is_empty() {
            return Err(OrderConfigError::EmptyName);
        }
        if self.revenue_share > MAX_REVENUE_SHARE {
            return Err(OrderConfigError::RevenueShareOutOfRange(self.revenue_share));
        }
        if let Some(registry) = registry {
            if let Some(unknown) = self.bidders.iter().find(|key| !registry.contains(key)) {
                return Err(OrderConfigError::UnknownBidder(unknown.clone()));
            }
        }
        Ok(())
    }
}

/// Cumulative order state as reported by the remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub order_id: OrderId,
    #[serde(default)]
    pub order_name: String,
    /// Empty until the line-items step has succeeded.
    #[serde(default)]
    pub line_item_ids: Vec<LineItemId>,
    /// Number of creative-association batches already completed.
    #[serde(default)]
    pub lica_batch_count: usize,
}

impl OrderState {
    /// State of an order that exists but has nothing attached yet.
    pub fn new(order_id: OrderId, order_name: impl Into<String>) -> Self {
        Self {
            order_id,
            order_name: order_name.into(),
            line_item_ids: Vec::new(),
            lica_batch_count: 0,
        }
    }

    /// Whether the server-side order is behind what `total_batches` requires.
    pub fn has_issues(&self, total_batches: usize) -> bool {
        self.line_item_ids.is_empty() || total_batches > self.lica_batch_count
    }
}

/// One line item / creative association descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicaEntry {
    pub line_item_id: LineItemId,
    pub creative_id: CreativeId,
}

/// Every association an order needs, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicaConfig(pub Vec<LicaEntry>);

impl LicaConfig {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of batches needed to associate everything; a zero batch size counts as one.
    pub fn total_batches(&self, batch_size: usize) -> usize {
        self.0.len().div_ceil(batch_size.max(1))
    }
}

/// Which entity a create call provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateKind {
    Order,
    LineItems,
    Creatives,
}

impl CreateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::LineItems => "line_items",
            Self::Creatives => "creatives",
        }
    }
}

impl fmt::Display for CreateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order settings as sent in a create request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub order_name: String,
    pub revenue_share: u8,
    pub bidders: Vec<String>,
}

impl From<&OrderConfig> for RequestConfig {
    fn from(config: &OrderConfig) -> Self {
        Self {
            order_name: config.name.clone(),
            revenue_share: config.revenue_share,
            bidders: config.bidders.iter().cloned().collect(),
        }
    }
}

/// Body of `POST bidding/gam/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub id: Option<OrderId>,
    #[serde(rename = "type")]
    pub kind: CreateKind,
    pub config: RequestConfig,
    /// 1-based creative batch number (creatives only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<usize>,
}

impl CreateRequest {
    /// Request creating the order itself.
    pub fn order(config: &OrderConfig) -> Self {
        Self {
            id: config.order_id,
            kind: CreateKind::Order,
            config: config.into(),
            batch: None,
        }
    }

    /// Request creating all line items of an existing order.
    pub fn line_items(order_id: OrderId, config: &OrderConfig) -> Self {
        Self {
            id: Some(order_id),
            kind: CreateKind::LineItems,
            config: config.into(),
            batch: None,
        }
    }

    /// Request creating one batch of creative associations.
    pub fn creatives(order_id: OrderId, config: &OrderConfig, batch: usize) -> Self {
        Self {
            id: Some(order_id),
            kind: CreateKind::Creatives,
            config: config.into(),
            batch: Some(batch),
        }
    }
}

/// Remote calls, used for recording and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterCall {
    CreateOrder,
    CreateLineItems,
    CreateCreatives,
    LicaConfig,
    Order,
    Bidders,
    Archive,
}

impl AdapterCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateOrder => "create_order",
            Self::CreateLineItems => "create_line_items",
            Self::CreateCreatives => "create_creatives",
            Self::LicaConfig => "lica_config",
            Self::Order => "order",
            Self::Bidders => "bidders",
            Self::Archive => "archive",
        }
    }
}

impl From<CreateKind> for AdapterCall {
    fn from(kind: CreateKind) -> Self {
        match kind {
            CreateKind::Order => Self::CreateOrder,
            CreateKind::LineItems => Self::CreateLineItems,
            CreateKind::Creatives => Self::CreateCreatives,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lica(len: usize) -> LicaConfig {
        LicaConfig(
            (0..len as u64)
                .map(|i| LicaEntry {
                    line_item_id: i,
                    creative_id: 1000 + i,
                })
                .collect(),
        )
    }

    #[test]
    fn test_total_batches() {
        assert_eq!(lica(250).total_batches(100), 3);
        assert_eq!(lica(200).total_batches(100), 2);
        assert_eq!(lica(1).total_batches(100), 1);
        assert_eq!(lica(0).total_batches(100), 0);
        assert_eq!(lica(3).total_batches(0), 3);
    }

    #[test]
    fn test_order_config_validation() {
        let config = OrderConfig::new("Header Bidding A", 20, ["medianet"]).unwrap();
        assert_eq!(config.order_id, None);
        assert!(config.bidders.contains("medianet"));

        assert_eq!(
            OrderConfig::new("  ", 20, ["medianet"]).unwrap_err(),
            OrderConfigError::EmptyName
        );
        assert_eq!(
            OrderConfig::new("A", 101, Vec::<String>::new()).unwrap_err(),
            OrderConfigError::RevenueShareOutOfRange(101)
        );
    }

    #[test]
    fn test_has_issues() {
        let mut state = OrderState::new(7, "A");
        assert!(state.has_issues(0));

        state.line_item_ids = vec![1, 2];
        assert!(!state.has_issues(0));
        assert!(state.has_issues(3));

        state.lica_batch_count = 3;
        assert!(!state.has_issues(3));
    }

    #[test]
    fn test_create_request_wire_format() {
        let config = OrderConfig::new("Header Bidding A", 20, ["medianet"])
            .unwrap()
            .with_order_id(99);
        let request = CreateRequest::creatives(99, &config, 2);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["id"], 99);
        assert_eq!(json["type"], "creatives");
        assert_eq!(json["batch"], 2);
        assert_eq!(json["config"]["order_name"], "Header Bidding A");
        assert_eq!(json["config"]["revenue_share"], 20);
        assert_eq!(json["config"]["bidders"][0], "medianet");

        let order_request = CreateRequest::order(&OrderConfig::new("B", 0, ["x"]).unwrap());
        let json = serde_json::to_value(&order_request).unwrap();
        assert!(json["id"].is_null());
        assert!(json.get("batch").is_none());
    }

    #[test]
    fn test_order_state_defaults_when_fields_missing() {
        let state: OrderState = serde_json::from_str(r#"{"order_id": 12}"#).unwrap();
        assert_eq!(state.order_id, 12);
        assert!(state.line_item_ids.is_empty());
        assert_eq!(state.lica_batch_count, 0);
    }
}
