//! SQLite persistence for the herdbook backend.
//!
//! One [`Store`] wraps a single connection behind a mutex, shared across the
//! HTTP handlers and the sync job via `Arc`. The schema lives in versioned
//! migration files applied once and tracked in a `_migrations` table.
//!
//! Timestamps are stored as RFC 3339 text and enum columns as their storage
//! strings; rows that fail to parse back surface as errors, never panics.

pub mod activity;
pub mod animals;
pub mod documents;
pub mod farms;
pub mod sync;
pub mod users;

#[cfg(test)]
pub(crate) mod testutil;

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use herdbook_core::ParseEnumError;
use rusqlite::types::Type;
use rusqlite::Connection;
use thiserror::Error;

pub use animals::{AnimalQuery, SyncedAnimal};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint fired (duplicate email, duplicate ear tag).
    #[error("already exists")]
    Duplicate,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database file inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join("herdbook.db"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let migrations = vec![(
        "0001_init",
        include_str!("../../../migrations/0001_init.sql"),
    )];

    for (name, sql) in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("applied migration {name}");
        }
    }

    Ok(())
}

/// Maps a uniqueness violation to [`StoreError::Duplicate`]; everything else
/// passes through.
pub(crate) fn map_unique(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(f, _) = &e {
        if f.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::Duplicate;
        }
    }
    StoreError::Db(e)
}

// ── Row parsing helpers ─────────────────────────────────────────────────────

pub(crate) fn parse_enum<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: ParseEnumError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_enum<T>(idx: usize, value: Option<String>) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = ParseEnumError>,
{
    value.map(|v| parse_enum(idx, v)).transpose()
}

pub(crate) fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_ts(idx, v)).transpose()
}

pub(crate) fn parse_json(idx: usize, value: String) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_json(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<serde_json::Value>> {
    value.map(|v| parse_json(idx, v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_idempotent_and_reopens_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            let user = herdbook_core::User::new("a@example.com".into(), None);
            store.insert_user(&user).unwrap();
        }
        // Second open must not re-run the schema migration.
        let store = Store::open(dir.path()).unwrap();
        assert!(store.user_by_email("a@example.com").unwrap().is_some());
    }

    #[test]
    fn corrupt_enum_column_surfaces_as_error() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);
        store
            .conn()
            .execute(
                "UPDATE farms SET sync_status = 'BOGUS' WHERE id = ?1",
                [&farm.id],
            )
            .unwrap();
        assert!(store.farm_by_id(&farm.id).is_err());
    }
}
