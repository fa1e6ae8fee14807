//! Input sanitizers for ad product fields.

use std::collections::BTreeSet;

use tracing::debug;

use super::types::{AdSize, PayableEvent};
use crate::metrics;

/// Trim placement keys and drop empty ones. Keys are otherwise free text.
pub fn sanitize_placements<I, S>(placements: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    placements
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parse a price. Empty or non-numeric input is 0; otherwise the value is
/// rounded to cents and clamped to be non-negative.
pub fn sanitize_price(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => round_cents(value),
        _ => 0.0,
    }
}

/// [`sanitize_price`] for JSON input, which may carry a number or a string.
pub fn sanitize_price_value(raw: &serde_json::Value) -> f64 {
    match raw {
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(round_cents)
            .unwrap_or(0.0),
        serde_json::Value::String(s) => sanitize_price(s),
        _ => 0.0,
    }
}

fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded > 0.0 {
        rounded
    } else {
        0.0
    }
}

/// Whitelist the payable event. Anything else sanitizes to empty.
pub fn sanitize_payable_event(raw: &str) -> Option<PayableEvent> {
    PayableEvent::parse(raw)
}

/// Keep the sizes that are exactly two numeric tokens joined by `x`.
/// Invalid entries are dropped without an error.
pub fn sanitize_sizes<I, S>(sizes: I) -> BTreeSet<AdSize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut kept = BTreeSet::new();
    for raw in sizes {
        match AdSize::parse(raw.as_ref()) {
            Some(size) => {
                kept.insert(size);
            }
            None => {
                debug!(size = %raw.as_ref(), "Dropping invalid ad size");
                metrics::SIZES_DROPPED.inc();
            }
        }
    }
    kept
}
