//! Ad product types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ProductId = u64;

/// Pricing model of an ad product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableEvent {
    Cpm,
    Cpc,
    Cpv,
    Cpd,
    ViewableCpm,
}

impl PayableEvent {
    pub const ALL: [PayableEvent; 5] = [
        PayableEvent::Cpm,
        PayableEvent::Cpc,
        PayableEvent::Cpv,
        PayableEvent::Cpd,
        PayableEvent::ViewableCpm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PayableEvent::Cpm => "cpm",
            PayableEvent::Cpc => "cpc",
            PayableEvent::Cpv => "cpv",
            PayableEvent::Cpd => "cpd",
            PayableEvent::ViewableCpm => "viewable_cpm",
        }
    }

    /// Parse an exact literal. Case and whitespace are significant.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

impl fmt::Display for PayableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A creative size in `WxH` form, e.g. `300x250`.
///
/// Only constructed through [`AdSize::parse`], so every value splits into
/// exactly two numeric dimensions. The original text is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AdSize(String);

impl AdSize {
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('x');
        let (Some(width), Some(height), None) = (parts.next(), parts.next(), parts.next()) else {
            return None;
        };
        (is_numeric(width) && is_numeric(height)).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Width and height as numbers.
    pub fn dimensions(&self) -> (f64, f64) {
        let mut parts = self.0.split('x').map(|p| p.parse::<f64>().unwrap_or(0.0));
        (parts.next().unwrap_or(0.0), parts.next().unwrap_or(0.0))
    }
}

impl<'de> Deserialize<'de> for AdSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AdSize::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid ad size '{}'", raw)))
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digits with at most one decimal point, and at least one digit.
fn is_numeric(token: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in token.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// A stored ad product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdProduct {
    pub id: ProductId,
    pub placements: BTreeSet<String>,
    /// Non-negative, rounded to cents.
    pub price: f64,
    /// `None` when the submitted event was not one of the allowed literals.
    pub payable_event: Option<PayableEvent>,
    pub required_sizes: BTreeSet<AdSize>,
}

/// Unsanitized product fields as submitted by a form or API client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub placements: Vec<String>,
    /// Number or numeric string.
    #[serde(default)]
    pub price: serde_json::Value,
    #[serde(default)]
    pub payable_event: String,
    #[serde(default)]
    pub required_sizes: Vec<String>,
}

/// Errors for product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Ad product not found: {0}")]
    NotFound(ProductId),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for ProductError {
    fn from(e: rusqlite::Error) -> Self {
        ProductError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payable_event_literals() {
        for event in PayableEvent::ALL {
            assert_eq!(PayableEvent::parse(event.as_str()), Some(event));
        }
        assert_eq!(PayableEvent::parse("CPM"), None);
        assert_eq!(
            serde_json::to_string(&PayableEvent::ViewableCpm).unwrap(),
            "\"viewable_cpm\""
        );
    }

    #[test]
    fn test_ad_size_parse() {
        assert_eq!(AdSize::parse("300x250").unwrap().as_str(), "300x250");
        assert_eq!(AdSize::parse("300.5x250").unwrap().dimensions(), (300.5, 250.0));
        assert!(AdSize::parse("300").is_none());
        assert!(AdSize::parse("300x").is_none());
        assert!(AdSize::parse("x250").is_none());
        assert!(AdSize::parse("300x250x1").is_none());
        assert!(AdSize::parse("300X250").is_none());
        assert!(AdSize::parse("300 x 250").is_none());
        assert!(AdSize::parse("axb").is_none());
        assert!(AdSize::parse("1.2.3x4").is_none());
    }

    #[test]
    fn test_ad_size_deserialize_rejects_invalid() {
        let ok: AdSize = serde_json::from_str("\"728x90\"").unwrap();
        assert_eq!(ok.to_string(), "728x90");
        assert!(serde_json::from_str::<AdSize>("\"wide\"").is_err());
    }
}
