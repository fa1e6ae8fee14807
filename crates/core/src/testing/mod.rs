//! Testing utilities and mock implementations.
//!
//! This module provides a mock ad server so the provisioning workflow and the
//! HTTP surface can be exercised without a real site or GAM network.
//!
//! # Example
//!
//! ```rust,ignore
//! use adprovision_core::testing::{fixtures, MockAdServer};
//!
//! let server = MockAdServer::new();
//! server.set_lica_len(250).await;
//! server.fail_next(AdapterCall::CreateLineItems, AdapterError::Timeout).await;
//!
//! let workflow = OrderWorkflow::new(Arc::new(server.clone()), config, fixtures::order_config("A"));
//! ```

mod mock_ad_server;

pub use mock_ad_server::{MockAdServer, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::adapter::{OrderConfig, OrderId, OrderState};
    use crate::bidders::{Bidder, BidderSetting};
    use crate::products::ProductInput;
    use crate::settings::FieldType;

    /// An order configuration targeting the `medianet` bidder at 20% revenue share.
    pub fn order_config(name: &str) -> OrderConfig {
        OrderConfig {
            order_id: None,
            name: name.to_string(),
            revenue_share: 20,
            bidders: ["medianet".to_string()].into_iter().collect(),
        }
    }

    /// A bidder with a single string setting named `{key}_id`.
    pub fn bidder(key: &str, name: &str) -> Bidder {
        let setting_key = format!("{}_id", key);
        Bidder {
            key: key.to_string(),
            name: name.to_string(),
            active_setting_key: setting_key.clone(),
            settings: vec![BidderSetting {
                key: setting_key,
                setting_type: FieldType::String,
                description: format!("{} account ID", name),
            }],
        }
    }

    /// An order with `line_items` line items and `batches` completed creative batches.
    pub fn order_state(order_id: OrderId, line_items: usize, batches: usize) -> OrderState {
        OrderState {
            order_id,
            order_name: format!("Order {}", order_id),
            line_item_ids: (1..=line_items as u64).map(|i| order_id * 1000 + i).collect(),
            lica_batch_count: batches,
        }
    }

    /// Raw product input as a form would submit it.
    pub fn product_input(price: &str, sizes: &[&str]) -> ProductInput {
        ProductInput {
            placements: vec!["sidebar".to_string(), "above_header".to_string()],
            price: serde_json::Value::String(price.to_string()),
            payable_event: "cpm".to_string(),
            required_sizes: sizes.iter().map(|s| s.to_string()).collect(),
        }
    }
}
