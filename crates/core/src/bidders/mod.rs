//! Header-bidding partners.
//!
//! Bidders are read-only entries loaded once at startup, from the config
//! file and from the remote server, and shared through an injected
//! [`BidderRegistry`].

mod registry;
mod types;

pub use registry::BidderRegistry;
pub use types::{Bidder, BidderSetting};
