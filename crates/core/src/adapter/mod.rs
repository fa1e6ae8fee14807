//! Remote ad-server adapter.
//!
//! The adapter is the only way the rest of the crate talks to the remote
//! ad server (the site backend that fronts Google Ad Manager). Every call is
//! idempotent from the caller's point of view and returns the cumulative
//! order state, so a workflow can be resumed after any partial failure.
//!
//! # Example
//!
//! ```ignore
//! use adprovision_core::adapter::{AdServerAdapter, CreateRequest, HttpAdServerAdapter};
//!
//! let adapter = HttpAdServerAdapter::new(config.adapter.clone().unwrap())?;
//! let order = adapter.create(CreateRequest::order(&order_config)).await?;
//! let lica = adapter.lica_config(order.order_id).await?;
//! println!("{} associations to create", lica.len());
//! ```

mod error;
mod http;
mod traits;
mod types;

pub use error::AdapterError;
pub use http::HttpAdServerAdapter;
pub use traits::AdServerAdapter;
pub use types::{
    AdapterCall, CreateKind, CreateRequest, CreativeId, LicaConfig, LicaEntry, LineItemId,
    OrderConfig, OrderConfigError, OrderId, OrderState, RequestConfig,
};
