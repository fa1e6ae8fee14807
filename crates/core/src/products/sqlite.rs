//! SQLite-backed ad product store.
//!
//! Each product field is a row in `post_meta` keyed by `_ad_product_<field>`.
//! The `ad_products` option holds the JSON array of every product id.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::sanitize::{
    sanitize_payable_event, sanitize_placements, sanitize_price_value, sanitize_sizes,
};
use super::{AdProduct, AdSize, PayableEvent, ProductError, ProductId, ProductInput, ProductStore};
use crate::options;

/// Prefix of every product meta key.
pub const META_PREFIX: &str = "_ad_product_";

/// Option holding the ids of all ad products.
pub const PRODUCTS_OPTION: &str = "ad_products";

const FIELD_PLACEMENTS: &str = "placements";
const FIELD_PRICE: &str = "price";
const FIELD_EVENT: &str = "event";
const FIELD_SIZES: &str = "required_sizes";

fn meta_key(field: &str) -> String {
    format!("{}{}", META_PREFIX, field)
}

/// SQLite-backed ad product store.
pub struct SqliteProductStore {
    conn: Mutex<Connection>,
}

impl SqliteProductStore {
    /// Open (or create) the store at the given database path.
    pub fn new(path: &Path) -> Result<Self, ProductError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, ProductError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ProductError> {
        options::ensure_schema(conn)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ad_product_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS post_meta (
                post_id INTEGER NOT NULL,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                PRIMARY KEY (post_id, meta_key)
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ProductError> {
        self.conn
            .lock()
            .map_err(|e| ProductError::Database(format!("Lock poisoned: {}", e)))
    }

    fn registry(conn: &Connection) -> Result<Vec<ProductId>, ProductError> {
        Ok(options::get::<Vec<ProductId>>(conn, PRODUCTS_OPTION)?.unwrap_or_default())
    }

    fn exists(conn: &Connection, id: ProductId) -> Result<bool, ProductError> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM ad_product_posts WHERE id = ?",
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn write_meta(conn: &Connection, id: ProductId, product: &AdProduct) -> Result<(), ProductError> {
        let event = product
            .payable_event
            .map(|e| e.as_str().to_string())
            .unwrap_or_default();
        let fields = [
            (FIELD_PLACEMENTS, to_json(&product.placements)?),
            (FIELD_PRICE, format!("{:.2}", product.price)),
            (FIELD_EVENT, event),
            (FIELD_SIZES, to_json(&product.required_sizes)?),
        ];

        for (field, value) in fields {
            conn.execute(
                "INSERT INTO post_meta (post_id, meta_key, meta_value) VALUES (?, ?, ?)
                 ON CONFLICT(post_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
                params![id as i64, meta_key(field), value],
            )?;
        }
        Ok(())
    }

    fn read_meta(conn: &Connection, id: ProductId) -> Result<AdProduct, ProductError> {
        if !Self::exists(conn, id)? {
            return Err(ProductError::NotFound(id));
        }

        let mut stmt = conn.prepare(
            "SELECT meta_key, meta_value FROM post_meta WHERE post_id = ? AND meta_key LIKE ?",
        )?;
        let rows = stmt.query_map(params![id as i64, format!("{}%", META_PREFIX)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut product = AdProduct {
            id,
            placements: BTreeSet::new(),
            price: 0.0,
            payable_event: None,
            required_sizes: BTreeSet::new(),
        };

        for row in rows {
            let (key, value) = row?;
            match key.strip_prefix(META_PREFIX) {
                Some(FIELD_PLACEMENTS) => {
                    product.placements = serde_json::from_str(&value).unwrap_or_default();
                }
                Some(FIELD_PRICE) => product.price = value.parse().unwrap_or(0.0),
                Some(FIELD_EVENT) => product.payable_event = PayableEvent::parse(&value),
                Some(FIELD_SIZES) => {
                    let raw: Vec<String> = serde_json::from_str(&value).unwrap_or_default();
                    product.required_sizes =
                        raw.iter().filter_map(|s| AdSize::parse(s)).collect();
                }
                _ => {}
            }
        }

        Ok(product)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ProductError> {
    serde_json::to_string(value).map_err(|e| ProductError::Database(e.to_string()))
}

fn sanitize(id: ProductId, input: &ProductInput) -> AdProduct {
    AdProduct {
        id,
        placements: sanitize_placements(&input.placements),
        price: sanitize_price_value(&input.price),
        payable_event: sanitize_payable_event(&input.payable_event),
        required_sizes: sanitize_sizes(&input.required_sizes),
    }
}

impl ProductStore for SqliteProductStore {
    fn create(&self, input: &ProductInput) -> Result<AdProduct, ProductError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO ad_product_posts (created_at) VALUES (?)",
            params![chrono::Utc::now().to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid() as ProductId;

        let product = sanitize(id, input);
        Self::write_meta(&tx, id, &product)?;

        let mut ids = Self::registry(&tx)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
        options::set(&tx, PRODUCTS_OPTION, &ids)?;

        tx.commit()?;
        info!(product_id = id, price = product.price, "Created ad product");
        Ok(product)
    }

    fn get(&self, id: ProductId) -> Result<AdProduct, ProductError> {
        let conn = self.lock()?;
        Self::read_meta(&conn, id)
    }

    fn update(&self, id: ProductId, input: &ProductInput) -> Result<AdProduct, ProductError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if !Self::exists(&tx, id)? {
            return Err(ProductError::NotFound(id));
        }

        let product = sanitize(id, input);
        Self::write_meta(&tx, id, &product)?;
        tx.commit()?;

        debug!(product_id = id, "Updated ad product");
        Ok(product)
    }

    fn delete(&self, id: ProductId) -> Result<(), ProductError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM ad_product_posts WHERE id = ?",
            params![id as i64],
        )?;
        if removed == 0 {
            return Err(ProductError::NotFound(id));
        }
        tx.execute("DELETE FROM post_meta WHERE post_id = ?", params![id as i64])?;

        let ids: Vec<ProductId> = Self::registry(&tx)?
            .into_iter()
            .filter(|existing| *existing != id)
            .collect();
        options::set(&tx, PRODUCTS_OPTION, &ids)?;

        tx.commit()?;
        info!(product_id = id, "Deleted ad product");
        Ok(())
    }

    fn list(&self) -> Result<Vec<AdProduct>, ProductError> {
        let conn = self.lock()?;
        let mut ids = Self::registry(&conn)?;
        ids.sort_unstable();

        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match Self::read_meta(&conn, id) {
                Ok(product) => products.push(product),
                // Registry entry without a backing product.
                Err(ProductError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(products)
    }

    fn ids(&self) -> Result<Vec<ProductId>, ProductError> {
        let conn = self.lock()?;
        Self::registry(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_create_sanitizes_input() {
        let store = SqliteProductStore::in_memory().unwrap();
        let input = ProductInput {
            placements: vec!["sidebar".into(), " ".into()],
            price: json!("3.14159"),
            payable_event: "bogus".into(),
            required_sizes: vec!["300x250".into(), "fluid".into()],
        };

        let product = store.create(&input).unwrap();
        assert_eq!(product.price, 3.14);
        assert_eq!(product.payable_event, None);
        assert_eq!(product.placements.len(), 1);
        assert_eq!(product.required_sizes.len(), 1);

        let stored = store.get(product.id).unwrap();
        assert_eq!(stored, product);
    }

    #[test]
    fn test_registry_tracks_ids() {
        let store = SqliteProductStore::in_memory().unwrap();
        let a = store.create(&fixtures::product_input("10", &["300x250"])).unwrap();
        let b = store.create(&fixtures::product_input("20", &["728x90"])).unwrap();
        assert_eq!(store.ids().unwrap(), vec![a.id, b.id]);

        store.delete(a.id).unwrap();
        assert_eq!(store.ids().unwrap(), vec![b.id]);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update_replaces_fields() {
        let store = SqliteProductStore::in_memory().unwrap();
        let created = store.create(&fixtures::product_input("10", &["300x250"])).unwrap();

        let mut input = fixtures::product_input("12.499", &["728x90", "320x50"]);
        input.payable_event = "cpc".into();
        let updated = store.update(created.id, &input).unwrap();

        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.payable_event, Some(PayableEvent::Cpc));
        assert_eq!(store.get(created.id).unwrap().required_sizes.len(), 2);
    }

    #[test]
    fn test_unknown_id() {
        let store = SqliteProductStore::in_memory().unwrap();
        assert!(matches!(store.get(99), Err(ProductError::NotFound(99))));
        assert!(matches!(store.delete(99), Err(ProductError::NotFound(99))));
        assert!(matches!(
            store.update(99, &ProductInput::default()),
            Err(ProductError::NotFound(99))
        ));
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = SqliteProductStore::in_memory().unwrap();
        let a = store.create(&ProductInput::default()).unwrap();
        store.delete(a.id).unwrap();
        let b = store.create(&ProductInput::default()).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ads.db");

        let id = {
            let store = SqliteProductStore::new(&path).unwrap();
            store.create(&fixtures::product_input("5", &["300x600"])).unwrap().id
        };

        let store = SqliteProductStore::new(&path).unwrap();
        let product = store.get(id).unwrap();
        assert_eq!(product.price, 5.0);
        assert_eq!(store.ids().unwrap(), vec![id]);
    }
}
