//! Durable row store.
//!
//! # Data Flow
//! ```text
//! Request handlers ──┐
//! Limiter admit()  ──┤
//! Cleanup sweep    ──┼──▶ Store (Mutex<Connection>) ──▶ SQLite file
//! Anonymize sweep  ──┤
//! Admin handlers   ──┘
//! ```
//!
//! # Design Decisions
//! - One handle, injected into each component at construction
//! - All access serializes on a single mutex: one writer owns the store
//!   at a time, which is the isolation the sweeps rely on
//! - Operations are short point lookups, range scans, and conditional
//!   updates; nothing holds the lock across an await
//! - Temporal operations take an explicit `now` so tests control the clock

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

pub mod admins;
pub mod blocks;
pub mod records;
pub mod samples;

pub use admins::AdminUser;
pub use blocks::BlockEntry;
pub use records::{NewRecord, SealedRecord, ANONYMIZED_SENTINEL};

/// Handle to the service's row store. Cheap to clone; all clones share one
/// connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) the store at `path` and initialize the
    /// schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store. Used by tests and ephemeral deployments.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Flush and release the handle. SQLite persists per statement; this
    /// checkpoints the WAL so shutdown leaves a clean single file.
    pub fn close(&self) -> Result<(), rusqlite::Error> {
        let conn = self.lock();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        self.lock().execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS admin_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS link_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ciphertext TEXT NOT NULL,
                iv TEXT NOT NULL,
                tag TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                user_agent TEXT,
                link TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS blocked_ips (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip_address TEXT UNIQUE NOT NULL,
                reason TEXT NOT NULL,
                blocked_at INTEGER NOT NULL,
                expires_at INTEGER,
                is_manual INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS rate_limit_tracking (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip_address TEXT NOT NULL,
                requested_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rate_limit_ip_time
                ON rate_limit_tracking(ip_address, requested_at);
            CREATE INDEX IF NOT EXISTS idx_blocked_ips_ip
                ON blocked_ips(ip_address);
            CREATE INDEX IF NOT EXISTS idx_link_requests_created
                ON link_requests(created_at);
            COMMIT;",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_init_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.init_schema().unwrap();
        assert_eq!(store.count_records().unwrap(), 0);
    }
}
