//! Storage layer for the per-domain time tracker.
//!
//! Provides a small persistent key-value store using `rusqlite`, and the
//! [`TotalsStore`] implementation the accountant writes through.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved to the task that drives the accountant but
//! cannot be shared across threads without external synchronization.
//!
//! # Schema
//!
//! A single `kv` table maps a text key to a JSON value. The domain totals live
//! under [`TOTALS_KEY`] as a flat object of domain to whole seconds:
//!
//! ```json
//! {"docs.rs": 420, "github.com": 75}
//! ```
//!
//! `updated_at` is stored as ISO 8601 text (e.g. `2025-01-15T10:30:00.000Z`).

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use dt_core::{DomainTotals, StoreError, TOTALS_KEY, TotalsStore};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value is not valid JSON.
    #[error("invalid JSON stored under {key}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp stored for {key}: {timestamp}")]
    TimestampParse {
        key: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidValue { key, source } => Self::Corrupt(format!("{key}: {source}")),
            other => Self::Backend(Box::new(other)),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Reads the JSON value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<Value>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| DbError::InvalidValue {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: &Value) -> Result<(), DbError> {
        self.set_at(key, value, Utc::now())
    }

    fn set_at(&self, key: &str, value: &Value, at: DateTime<Utc>) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
            params![key, value.to_string(), format_timestamp(at)],
        )?;
        Ok(())
    }

    /// When `key` was last written, if ever.
    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, DbError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT updated_at FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|timestamp| parse_timestamp(&timestamp, key))
            .transpose()
    }

    /// Reads the domain totals. A missing key is an empty mapping.
    pub fn domain_totals(&self) -> Result<DomainTotals, DbError> {
        let Some(value) = self.get(TOTALS_KEY)? else {
            return Ok(DomainTotals::new());
        };
        serde_json::from_value(value).map_err(|source| DbError::InvalidValue {
            key: TOTALS_KEY.to_string(),
            source,
        })
    }

    /// Overwrites the domain totals.
    pub fn set_domain_totals(&self, totals: &DomainTotals) -> Result<(), DbError> {
        let value = serde_json::to_value(totals).map_err(|source| DbError::InvalidValue {
            key: TOTALS_KEY.to_string(),
            source,
        })?;
        self.set(TOTALS_KEY, &value)
    }
}

impl TotalsStore for Database {
    fn load(&self) -> Result<DomainTotals, StoreError> {
        Ok(self.domain_totals()?)
    }

    fn save(&mut self, totals: &DomainTotals) -> Result<(), StoreError> {
        self.set_domain_totals(totals)?;
        tracing::trace!(domains = totals.len(), "saved domain totals");
        Ok(())
    }
}

fn parse_timestamp(timestamp: &str, key: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            key: key.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use dt_core::{Accountant, DomainId, ManualClock};

    fn domain(s: &str) -> DomainId {
        DomainId::new(s).unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.get("missing").unwrap().is_none());
    }

    #[test]
    fn set_replaces_previous_value() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.set("k", &serde_json::json!({"a": 1})).unwrap();
        db.set("k", &serde_json::json!({"b": 2})).unwrap();

        assert_eq!(db.get("k").unwrap(), Some(serde_json::json!({"b": 2})));
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn updated_at_tracks_last_write() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.updated_at(TOTALS_KEY).unwrap().is_none());

        let at = DateTime::parse_from_rfc3339("2025-01-01T12:00:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        db.set_at(TOTALS_KEY, &serde_json::json!({}), at).unwrap();

        assert_eq!(db.updated_at(TOTALS_KEY).unwrap(), Some(at));
    }

    #[test]
    fn missing_totals_are_empty() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.domain_totals().unwrap().is_empty());
    }

    #[test]
    fn totals_are_stored_as_flat_object() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let totals: DomainTotals = [(domain("a.com"), 5), (domain("b.com"), 3)]
            .into_iter()
            .collect();
        db.set_domain_totals(&totals).unwrap();

        let raw: String = db
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [TOTALS_KEY], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(raw, r#"{"a.com":5,"b.com":3}"#);
        assert_eq!(db.domain_totals().unwrap(), totals);
    }

    #[test]
    fn corrupt_totals_surface_as_corrupt_store_error() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.set(TOTALS_KEY, &serde_json::json!({"a.com": "ten"}))
            .unwrap();

        let err = TotalsStore::load(&db).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)), "got {err:?}");
    }

    #[test]
    fn reset_overwrites_with_empty_mapping() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.set_domain_totals(&[(domain("a.com"), 5)].into_iter().collect())
            .unwrap();

        db.reset().unwrap();
        assert!(db.domain_totals().unwrap().is_empty());
        assert_eq!(db.get(TOTALS_KEY).unwrap(), Some(serde_json::json!({})));
    }

    #[test]
    fn totals_survive_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dt.db");
        let clock = ManualClock::from_millis(0);

        {
            let db = Database::open(&path).unwrap();
            let mut acc = Accountant::new(db, clock.clone());
            acc.switch_to(Some(domain("a.com"))).unwrap();
            clock.set_millis(5_000);
            acc.switch_to(Some(domain("b.com"))).unwrap();
            clock.set_millis(8_000);
            acc.switch_to(None).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let totals = db.domain_totals().unwrap();
        assert_eq!(totals.get(&domain("a.com")), 5);
        assert_eq!(totals.get(&domain("b.com")), 3);
    }
}
