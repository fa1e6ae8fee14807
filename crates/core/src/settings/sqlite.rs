//! SQLite-backed settings store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use super::types::is_valid_key;
use super::{SettingValue, SettingsError, SettingsSection, SettingsStore};
use crate::bidders::BidderRegistry;
use crate::options;

/// Settings stored as individual rows of the `options` table.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
    prefix: String,
    sections: Vec<SettingsSection>,
}

impl SqliteSettingsStore {
    /// Open (or create) the store with the built-in sections.
    pub fn new(path: &Path, prefix: &str) -> Result<Self, SettingsError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, prefix)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(prefix: &str) -> Result<Self, SettingsError> {
        Self::from_connection(Connection::open_in_memory()?, prefix)
    }

    fn from_connection(conn: Connection, prefix: &str) -> Result<Self, SettingsError> {
        options::ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            prefix: prefix.to_string(),
            sections: vec![SettingsSection::lazy_load()],
        })
    }

    /// Add the bidding section derived from the registered bidders.
    pub fn with_registry(mut self, registry: &BidderRegistry) -> Self {
        self.sections.push(SettingsSection::bidding(registry));
        self
    }

    /// Option name a value is stored under.
    pub fn option_name(&self, section: &str, key: &str) -> String {
        format!("{}{}_{}", self.prefix, section, key)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SettingsError> {
        self.conn
            .lock()
            .map_err(|e| SettingsError::Database(format!("Lock poisoned: {}", e)))
    }

    fn section(&self, section: &str) -> Result<&SettingsSection, SettingsError> {
        self.sections
            .iter()
            .find(|s| s.key == section)
            .ok_or_else(|| SettingsError::NotFound(format!("section '{}'", section)))
    }

    fn validate_keys(section: &str, key: &str) -> Result<(), SettingsError> {
        for part in [section, key] {
            if !is_valid_key(part) {
                return Err(SettingsError::Validation(format!(
                    "'{}' must be non-empty and use only a-z, 0-9 and _",
                    part
                )));
            }
        }
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn sections(&self) -> Vec<SettingsSection> {
        self.sections.clone()
    }

    fn get_section(&self, section: &str) -> Result<Vec<SettingValue>, SettingsError> {
        let declared = self.section(section)?;
        let conn = self.lock()?;

        declared
            .fields
            .iter()
            .map(|field| -> Result<SettingValue, SettingsError> {
                let stored: Option<Value> =
                    options::get(&conn, &self.option_name(section, &field.key))?;
                Ok(SettingValue {
                    key: field.key.clone(),
                    field_type: field.field_type,
                    value: stored.unwrap_or_else(|| field.default.clone()),
                    description: field.description.clone(),
                })
            })
            .collect()
    }

    fn get(&self, section: &str, key: &str) -> Result<Value, SettingsError> {
        Self::validate_keys(section, key)?;
        let field = self
            .section(section)?
            .field(key)
            .ok_or_else(|| SettingsError::NotFound(format!("{}.{}", section, key)))?;

        let conn = self.lock()?;
        let stored: Option<Value> = options::get(&conn, &self.option_name(section, key))?;
        Ok(stored.unwrap_or_else(|| field.default.clone()))
    }

    fn update(&self, section: &str, key: &str, value: Value) -> Result<SettingValue, SettingsError> {
        Self::validate_keys(section, key)?;
        let field = self
            .section(section)?
            .field(key)
            .ok_or_else(|| SettingsError::NotFound(format!("{}.{}", section, key)))?;

        if !field.field_type.accepts(&value) {
            return Err(SettingsError::Validation(format!(
                "{}.{} expects a {} value",
                section,
                key,
                field.field_type.as_str()
            )));
        }

        let conn = self.lock()?;
        options::set(&conn, &self.option_name(section, key), &value)?;
        info!(section, key, "Updated ad setting");

        Ok(SettingValue {
            key: field.key.clone(),
            field_type: field.field_type,
            value,
            description: field.description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FieldType;
    use crate::testing::fixtures;
    use serde_json::json;

    fn store() -> SqliteSettingsStore {
        let registry =
            BidderRegistry::from_bidders(vec![fixtures::bidder("medianet", "Media.net")]);
        SqliteSettingsStore::in_memory("_ads_")
            .unwrap()
            .with_registry(&registry)
    }

    #[test]
    fn test_defaults_when_unset() {
        let store = store();
        let values = store.get_section("lazy_load").unwrap();
        let active = values.iter().find(|v| v.key == "active").unwrap();
        assert_eq!(active.value, json!(true));
        assert_eq!(active.field_type, FieldType::Boolean);
    }

    #[test]
    fn test_update_and_read_back() {
        let store = store();
        store
            .update("lazy_load", "fetch_margin_percent", json!(200))
            .unwrap();
        assert_eq!(
            store.get("lazy_load", "fetch_margin_percent").unwrap(),
            json!(200)
        );
        assert_eq!(
            store.option_name("lazy_load", "fetch_margin_percent"),
            "_ads_lazy_load_fetch_margin_percent"
        );
    }

    #[test]
    fn test_malformed_key_is_validation_error() {
        let store = store();
        for key in ["", "Active", "fetch-margin", "a b"] {
            let err = store.update("lazy_load", key, json!(true)).unwrap_err();
            assert!(matches!(err, SettingsError::Validation(_)), "key {:?}", key);
        }
    }

    #[test]
    fn test_malformed_key_is_not_persisted() {
        let store = store();
        assert!(store.update("lazy_load", "Active", json!(false)).is_err());
        assert_eq!(store.get("lazy_load", "active").unwrap(), json!(true));
    }

    #[test]
    fn test_unknown_section_or_key() {
        let store = store();
        assert!(matches!(
            store.update("nope", "active", json!(true)),
            Err(SettingsError::NotFound(_))
        ));
        assert!(matches!(
            store.update("lazy_load", "nope", json!(true)),
            Err(SettingsError::NotFound(_))
        ));
        assert!(matches!(
            store.get_section("nope"),
            Err(SettingsError::NotFound(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let store = store();
        let err = store
            .update("lazy_load", "active", json!("yes"))
            .unwrap_err();
        assert!(matches!(err, SettingsError::Validation(_)));

        let err = store
            .update("lazy_load", "fetch_margin_percent", json!(1.5))
            .unwrap_err();
        assert!(matches!(err, SettingsError::Validation(_)));
    }

    #[test]
    fn test_bidding_section() {
        let store = store();
        store
            .update("bidding", "medianet_id", json!("8CU1234"))
            .unwrap();
        let values = store.get_section("bidding").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, json!("8CU1234"));
    }

    #[test]
    fn test_sections_without_registry() {
        let store = SqliteSettingsStore::in_memory("_ads_").unwrap();
        let keys: Vec<String> = store.sections().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["lazy_load"]);
    }
}
