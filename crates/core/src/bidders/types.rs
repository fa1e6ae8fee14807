//! Bidder types.

use serde::{Deserialize, Serialize};

use crate::settings::FieldType;

/// A header-bidding demand partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bidder {
    /// Prebid bidder code, e.g. `medianet`.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Setting whose presence marks the bidder as active.
    pub active_setting_key: String,
    /// Settings the bidder needs.
    #[serde(default)]
    pub settings: Vec<BidderSetting>,
}

/// A setting a bidder exposes in the bidding settings section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidderSetting {
    pub key: String,
    #[serde(rename = "type", default)]
    pub setting_type: FieldType,
    #[serde(default)]
    pub description: String,
}
