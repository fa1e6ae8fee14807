//! Site-wide ad settings, grouped in sections.
//!
//! Every value is stored as its own option named `{prefix}{section}_{key}`.
//! Reading a section falls back to the field default for anything unset.

mod sqlite;
mod types;

pub use sqlite::SqliteSettingsStore;
pub use types::*;

use serde_json::Value;

/// Trait for settings storage.
pub trait SettingsStore: Send + Sync {
    /// All known sections.
    fn sections(&self) -> Vec<SettingsSection>;

    /// Every field of a section with its stored value or default.
    fn get_section(&self, section: &str) -> Result<Vec<SettingValue>, SettingsError>;

    /// A single value, falling back to the field default.
    fn get(&self, section: &str, key: &str) -> Result<Value, SettingsError>;

    /// Validate and store a value.
    fn update(&self, section: &str, key: &str, value: Value) -> Result<SettingValue, SettingsError>;
}
