// 🗄️ SQLite Storage
// Durable cache + property store sharing one database file (WAL mode)

use crate::cache::Cache;
use crate::config::{parse_bool, PropertyStore};
use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

fn cache_err(e: rusqlite::Error) -> FeedError {
    FeedError::Cache(e.to_string())
}

fn property_err(e: rusqlite::Error) -> FeedError {
    FeedError::Property(e.to_string())
}

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // Enable WAL mode so CLI and server can share the file
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    // ==========================================================================
    // Cache entries (one row per key, RFC 3339 expiry)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Properties (configuration key/value store)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS properties (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SQLITE CACHE
// ============================================================================

/// SqliteCache - cache rows with an expiry timestamp
///
/// Expired rows read as absent and are deleted on the way out.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new(conn: Connection) -> FeedResult<Self> {
        setup_database(&conn).map_err(cache_err)?;
        Ok(SqliteCache {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: &Path) -> FeedResult<Self> {
        Self::new(Connection::open(path).map_err(cache_err)?)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Cache for SqliteCache {
    fn get(&self, key: &str) -> FeedResult<Option<String>> {
        let conn = self.lock();

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(cache_err)?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        // Unparsable expiry counts as expired
        let live = DateTime::parse_from_rfc3339(&expires_at)
            .map(|dt| dt.with_timezone(&Utc) > Utc::now())
            .unwrap_or(false);

        if live {
            Ok(Some(value))
        } else {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                .map_err(cache_err)?;
            Ok(None)
        }
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> FeedResult<()> {
        let out_of_range = || FeedError::Cache(format!("ttl out of range: {}s", ttl.as_secs()));
        let delta = chrono::Duration::from_std(ttl).map_err(|_| out_of_range())?;
        let expires_at = Utc::now()
            .checked_add_signed(delta)
            .ok_or_else(out_of_range)?
            .to_rfc3339();

        self.lock()
            .execute(
                "INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                expires_at = excluded.expires_at,
                                                created_at = CURRENT_TIMESTAMP",
                params![key, value, expires_at],
            )
            .map_err(cache_err)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> FeedResult<()> {
        self.lock()
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .map_err(cache_err)?;
        Ok(())
    }
}

// ============================================================================
// SQLITE PROPERTY STORE
// ============================================================================

/// SqlitePropertyStore - persistent configuration properties
pub struct SqlitePropertyStore {
    conn: Mutex<Connection>,
}

impl SqlitePropertyStore {
    pub fn new(conn: Connection) -> FeedResult<Self> {
        setup_database(&conn).map_err(property_err)?;
        Ok(SqlitePropertyStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: &Path) -> FeedResult<Self> {
        Self::new(Connection::open(path).map_err(property_err)?)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All stored properties, sorted by key
    pub fn all(&self) -> FeedResult<Vec<(String, String)>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT key, value FROM properties ORDER BY key")
            .map_err(property_err)?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(property_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(property_err)?;

        Ok(rows)
    }
}

impl PropertyStore for SqlitePropertyStore {
    fn get(&self, key: &str) -> FeedResult<Option<String>> {
        self.lock()
            .query_row(
                "SELECT value FROM properties WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(property_err)
    }

    fn set(&self, key: &str, value: &str) -> FeedResult<()> {
        self.lock()
            .execute(
                "INSERT INTO properties (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = CURRENT_TIMESTAMP",
                params![key, value],
            )
            .map_err(property_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> FeedResult<()> {
        self.lock()
            .execute("DELETE FROM properties WHERE key = ?1", params![key])
            .map_err(property_err)?;
        Ok(())
    }

    fn take_flag(&self, key: &str) -> FeedResult<bool> {
        let conn = self.lock();

        let current: Option<String> = conn
            .query_row(
                "SELECT value FROM properties WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(property_err)?;

        let Some(current) = current else {
            return Ok(false);
        };
        if !parse_bool(&current) {
            return Ok(false);
        }

        // Conditional reset: only the reader that flips the stored value wins
        let changed = conn
            .execute(
                "UPDATE properties SET value = 'false', updated_at = CURRENT_TIMESTAMP
                 WHERE key = ?1 AND value = ?2",
                params![key, current],
            )
            .map_err(property_err)?;

        Ok(changed == 1)
    }
}
