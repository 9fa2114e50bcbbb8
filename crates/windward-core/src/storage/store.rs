//! Process-shared key/value store.
//!
//! The only coordination channel between the interactive process and the
//! short-lived monitor process (besides the snapshot log). Every access is
//! an independent single-key read or write -- no multi-key transactions,
//! no locks held across invocations. Consumers are written so that any
//! interleaving of single-key writes from the two processes reconciles on
//! the next read (last write wins per key).
//!
//! Reads and writes degrade: a failing store yields the caller-supplied
//! default on read and becomes a logged no-op on write. Nothing in here
//! may take down the monitor process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::data_dir;
use crate::error::StoreError;

/// Semantic keys shared by both processes.
pub mod keys {
    pub const WIND_BASELINE: &str = "wind.cumulativeBaselineSeconds";
    pub const WIND_LAST_THRESHOLD: &str = "wind.lastThresholdSeconds";
    pub const WIND_BREAK_REDUCTION: &str = "wind.breakReductionSeconds";
    pub const WIND_POINTS: &str = "wind.points";
    pub const WIND_LAST_RECONCILED_DATE: &str = "wind.lastReconciledDate";
    pub const LIMIT_SECONDS: &str = "limit.seconds";
    pub const SHIELD_IS_ACTIVE: &str = "shield.isActive";
    pub const SHIELD_ACTIVATED_AT: &str = "shield.activatedAt";
    pub const SHIELD_COOLDOWN_UNTIL: &str = "shield.cooldownUntil";
    pub const SHIELD_BLOCKLIST: &str = "shield.blocklistTokens";
    pub const BREAK_ACTIVE_KIND: &str = "break.activeKind";
    pub const BREAK_STARTED_AT: &str = "break.startedAt";
    pub const BREAK_PLANNED_MINUTES: &str = "break.plannedMinutes";
    pub const BREAK_UNTIL_END_OF_DAY: &str = "break.untilEndOfDay";
    pub const BREAK_DECAY_APPLIED_AT: &str = "break.decayAppliedAt";
    pub const BREAK_COMPLETION_NOTIFIED: &str = "break.completionNotified";
    pub const COMPANION_HISTORY: &str = "companion.history";
}

/// Durable single-key string store shared between processes.
///
/// Implementations provide raw `get`/`set`/`remove`; the typed helpers are
/// provided methods that encode the degrade-to-default contract.
pub trait StateStore {
    /// Read a raw value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Read a string, degrading to `None` on store failure.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed; using default");
                None
            }
        }
    }

    /// Read a u64, degrading to `default` on failure or absence.
    fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        self.get_string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Read an f64, degrading to `default` on failure or absence.
    fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get_string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Read a bool, degrading to `default` on failure or absence.
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Write a string; store failure is a logged no-op.
    fn put(&self, key: &str, value: &str) {
        if let Err(e) = self.set(key, value) {
            tracing::warn!(key, error = %e, "store write failed; dropped");
        }
    }

    /// Write a u64; store failure is a logged no-op.
    fn put_u64(&self, key: &str, value: u64) {
        self.put(key, &value.to_string());
    }

    /// Write an f64; store failure is a logged no-op.
    fn put_f64(&self, key: &str, value: f64) {
        self.put(key, &value.to_string());
    }

    /// Write a bool; store failure is a logged no-op.
    fn put_bool(&self, key: &str, value: bool) {
        self.put(key, &value.to_string());
    }

    /// Remove a key; store failure is a logged no-op.
    fn clear(&self, key: &str) {
        if let Err(e) = self.remove(key) {
            tracing::warn!(key, error = %e, "store remove failed; dropped");
        }
    }
}

/// SQLite-backed shared store.
///
/// A single `kv(key, value)` table in the shared container. Each access is
/// one statement, so "atomic single-key read/write" holds across the two
/// processes without any cross-field guarantees.
pub struct SharedStore {
    conn: Connection,
}

impl SharedStore {
    /// Open the store at `~/.config/windward/windward.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Self::open_at(dir.join("windward.db"))
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        // Both processes may touch the store at once; wait briefly instead
        // of surfacing SQLITE_BUSY for sub-millisecond writes.
        conn.busy_timeout(std::time::Duration::from_millis(250))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl StateStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self
            .map
            .lock()
            .map_err(|_| StoreError::QueryFailed("poisoned lock".into()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| StoreError::QueryFailed("poisoned lock".into()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| StoreError::QueryFailed("poisoned lock".into()))?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store that fails every operation, for degrade-path tests.
    pub struct FailingStore;

    impl StateStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::QueryFailed("unavailable".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::QueryFailed("unavailable".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::QueryFailed("unavailable".into()))
        }
    }

    #[test]
    fn kv_roundtrip() {
        let store = SharedStore::open_memory().unwrap();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set(keys::WIND_POINTS, "42.5").unwrap();
        assert_eq!(store.get(keys::WIND_POINTS).unwrap().as_deref(), Some("42.5"));

        store.set(keys::WIND_POINTS, "50").unwrap();
        assert_eq!(store.get(keys::WIND_POINTS).unwrap().as_deref(), Some("50"));

        store.remove(keys::WIND_POINTS).unwrap();
        assert_eq!(store.get(keys::WIND_POINTS).unwrap(), None);
    }

    #[test]
    fn typed_helpers_parse_and_default() {
        let store = MemoryStore::new();
        store.put_u64(keys::WIND_BASELINE, 600);
        store.put_f64(keys::WIND_POINTS, 33.3);
        store.put_bool(keys::SHIELD_IS_ACTIVE, true);

        assert_eq!(store.get_u64_or(keys::WIND_BASELINE, 0), 600);
        assert_eq!(store.get_f64_or(keys::WIND_POINTS, 0.0), 33.3);
        assert!(store.get_bool_or(keys::SHIELD_IS_ACTIVE, false));

        // Absent keys yield defaults.
        assert_eq!(store.get_u64_or("nope", 7), 7);
        assert!(!store.get_bool_or("nope", false));
    }

    #[test]
    fn unparseable_values_degrade_to_default() {
        let store = MemoryStore::new();
        store.put(keys::WIND_BASELINE, "not-a-number");
        assert_eq!(store.get_u64_or(keys::WIND_BASELINE, 13), 13);
    }

    #[test]
    fn failing_store_degrades_without_panicking() {
        let store = FailingStore;
        assert_eq!(store.get_u64_or(keys::WIND_BASELINE, 5), 5);
        assert_eq!(store.get_string(keys::WIND_POINTS), None);
        // Writes become no-ops.
        store.put_u64(keys::WIND_BASELINE, 100);
        store.clear(keys::WIND_POINTS);
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windward.db");

        {
            let store = SharedStore::open_at(path.clone()).unwrap();
            store.put_u64(keys::WIND_BASELINE, 900);
        }
        let store = SharedStore::open_at(path).unwrap();
        assert_eq!(store.get_u64_or(keys::WIND_BASELINE, 0), 900);
    }
}
