//! Settings types.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::bidders::BidderRegistry;

/// Section holding lazy loading options.
pub const LAZY_LOAD_SECTION: &str = "lazy_load";

/// Section holding one field per bidder setting.
pub const BIDDING_SECTION: &str = "bidding";

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").unwrap());

/// Whether a section or field key only uses lowercase letters, digits and underscores.
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Value type of a setting field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Boolean,
    Integer,
    Number,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
        }
    }

    /// Whether a JSON value has this type. `null` never matches.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
        }
    }
}

/// A declared setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingField {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub description: String,
}

impl SettingField {
    pub fn new(key: &str, field_type: FieldType, default: Value, description: &str) -> Self {
        Self {
            key: key.to_string(),
            field_type,
            default,
            description: description.to_string(),
        }
    }
}

/// A group of settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSection {
    pub key: String,
    pub title: String,
    pub fields: Vec<SettingField>,
}

impl SettingsSection {
    pub fn field(&self, key: &str) -> Option<&SettingField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Lazy loading of ad slots.
    pub fn lazy_load() -> Self {
        Self {
            key: LAZY_LOAD_SECTION.to_string(),
            title: "Lazy Loading".to_string(),
            fields: vec![
                SettingField::new(
                    "active",
                    FieldType::Boolean,
                    json!(true),
                    "Enable lazy loading of ads",
                ),
                SettingField::new(
                    "fetch_margin_percent",
                    FieldType::Integer,
                    json!(100),
                    "Viewport percentage from which ads are fetched",
                ),
                SettingField::new(
                    "render_margin_percent",
                    FieldType::Integer,
                    json!(0),
                    "Viewport percentage from which ads are rendered",
                ),
                SettingField::new(
                    "mobile_scaling",
                    FieldType::Number,
                    json!(2),
                    "Margin multiplier on mobile devices",
                ),
            ],
        }
    }

    /// One field per bidder setting, in registry order.
    pub fn bidding(registry: &BidderRegistry) -> Self {
        let fields = registry
            .iter()
            .flat_map(|bidder| {
                bidder.settings.iter().map(move |setting| SettingField {
                    key: setting.key.clone(),
                    field_type: setting.setting_type,
                    default: Value::Null,
                    description: if setting.description.is_empty() {
                        bidder.name.clone()
                    } else {
                        format!("{}: {}", bidder.name, setting.description)
                    },
                })
            })
            .collect();

        Self {
            key: BIDDING_SECTION.to_string(),
            title: "Header Bidding".to_string(),
            fields,
        }
    }
}

/// A field together with its effective value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingValue {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: Value,
    pub description: String,
}

/// Errors for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid setting: {0}")]
    Validation(String),

    #[error("Setting not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for SettingsError {
    fn from(e: rusqlite::Error) -> Self {
        SettingsError::Database(e.to_string())
    }
}
