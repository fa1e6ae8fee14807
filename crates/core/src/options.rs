//! Named option storage shared by the product and settings stores.
//!
//! Options are plain key/value rows in a single `options` table. Values are
//! stored as JSON text so every store can keep its own shape.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

/// Create the `options` table if it does not exist.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS options (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
}

/// Read an option. Returns `None` when the option is missing or its value
/// no longer decodes as `T`.
pub fn get<T: DeserializeOwned>(conn: &Connection, name: &str) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM options WHERE name = ?",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    Ok(raw.and_then(|value| serde_json::from_str(&value).ok()))
}

/// Insert or replace an option.
pub fn set<T: Serialize>(conn: &Connection, name: &str, value: &T) -> rusqlite::Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO options (name, value, updated_at) VALUES (?, ?, ?)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![name, json, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Delete an option. Returns whether it existed.
pub fn delete(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute("DELETE FROM options WHERE name = ?", params![name])?;
    Ok(removed > 0)
}
