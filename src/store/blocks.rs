//! Blocked-IP table operations.
//!
//! At most one entry exists per IP (unique key). A manual block has
//! `expires_at = NULL` and only an explicit unblock removes it; an automatic
//! block always carries a future expiry and falls to the cleanup sweep.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::store::Store;

/// One row of the blocked-IP set.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    pub id: i64,
    pub ip_address: String,
    pub reason: String,
    pub blocked_at: i64,
    pub expires_at: Option<i64>,
    pub is_manual: bool,
}

impl BlockEntry {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            ip_address: row.get(1)?,
            reason: row.get(2)?,
            blocked_at: row.get(3)?,
            expires_at: row.get(4)?,
            is_manual: row.get::<_, i64>(5)? != 0,
        })
    }
}

const COLUMNS: &str = "id, ip_address, reason, blocked_at, expires_at, is_manual";

impl Store {
    /// Point lookup: the active block for `ip`, if any. A block is active
    /// while it has no expiry or its expiry is still in the future; at
    /// `now == expires_at` it is no longer active.
    pub fn active_block(&self, ip: &str, now: i64) -> Result<Option<BlockEntry>, rusqlite::Error> {
        self.lock()
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM blocked_ips
                     WHERE ip_address = ?1 AND (expires_at IS NULL OR expires_at > ?2)"
                ),
                params![ip, now],
                BlockEntry::from_row,
            )
            .optional()
    }

    /// Insert an automatic block expiring at `expires_at`. Idempotent: if any
    /// block already exists for the IP the insert is a no-op, not an error,
    /// so a racing double-insert cannot corrupt state.
    pub fn insert_auto_block(
        &self,
        ip: &str,
        reason: &str,
        now: i64,
        expires_at: i64,
    ) -> Result<(), rusqlite::Error> {
        self.lock().execute(
            "INSERT INTO blocked_ips (ip_address, reason, blocked_at, expires_at, is_manual)
             VALUES (?1, ?2, ?3, ?4, 0)
             ON CONFLICT(ip_address) DO NOTHING",
            params![ip, reason, now, expires_at],
        )?;
        Ok(())
    }

    /// Insert or replace a manual block. Manual blocks never expire.
    pub fn insert_manual_block(
        &self,
        ip: &str,
        reason: &str,
        now: i64,
    ) -> Result<(), rusqlite::Error> {
        self.lock().execute(
            "INSERT INTO blocked_ips (ip_address, reason, blocked_at, expires_at, is_manual)
             VALUES (?1, ?2, ?3, NULL, 1)
             ON CONFLICT(ip_address) DO UPDATE SET
                 reason = excluded.reason,
                 blocked_at = excluded.blocked_at,
                 expires_at = NULL,
                 is_manual = 1",
            params![ip, reason, now],
        )?;
        Ok(())
    }

    /// Remove any block (manual or automatic) for `ip`. Returns whether a
    /// row was deleted.
    pub fn remove_block(&self, ip: &str) -> Result<bool, rusqlite::Error> {
        let affected = self
            .lock()
            .execute("DELETE FROM blocked_ips WHERE ip_address = ?1", params![ip])?;
        Ok(affected > 0)
    }

    /// All currently active blocks, newest first.
    pub fn list_active_blocks(&self, now: i64) -> Result<Vec<BlockEntry>, rusqlite::Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM blocked_ips
             WHERE expires_at IS NULL OR expires_at > ?1
             ORDER BY blocked_at DESC"
        ))?;
        let rows = stmt.query_map(params![now], BlockEntry::from_row)?;
        rows.collect()
    }

    /// Count of currently active blocks.
    pub fn count_active_blocks(&self, now: i64) -> Result<i64, rusqlite::Error> {
        self.lock().query_row(
            "SELECT COUNT(*) FROM blocked_ips WHERE expires_at IS NULL OR expires_at > ?1",
            params![now],
            |row| row.get(0),
        )
    }

    /// Delete expired automatic blocks. Manual blocks are never touched.
    pub fn remove_expired_auto_blocks(&self, now: i64) -> Result<usize, rusqlite::Error> {
        self.lock().execute(
            "DELETE FROM blocked_ips
             WHERE expires_at IS NOT NULL AND expires_at < ?1 AND is_manual = 0",
            params![now],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_block_insert_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.insert_auto_block("10.0.0.1", "rate limit exceeded", 100, 200).unwrap();
        store.insert_auto_block("10.0.0.1", "rate limit exceeded", 150, 999).unwrap();

        let entry = store.active_block("10.0.0.1", 100).unwrap().unwrap();
        // First insert wins; the racing second insert changed nothing.
        assert_eq!(entry.expires_at, Some(200));
        assert!(!entry.is_manual);
    }

    #[test]
    fn block_expiry_boundary_is_exclusive() {
        let store = Store::open_in_memory().unwrap();
        store.insert_auto_block("10.0.0.2", "rate limit exceeded", 100, 200).unwrap();

        assert!(store.active_block("10.0.0.2", 199).unwrap().is_some());
        assert!(store.active_block("10.0.0.2", 200).unwrap().is_none());
    }

    #[test]
    fn manual_block_replaces_auto_block_and_never_expires() {
        let store = Store::open_in_memory().unwrap();
        store.insert_auto_block("10.0.0.3", "rate limit exceeded", 100, 200).unwrap();
        store.insert_manual_block("10.0.0.3", "abuse", 150).unwrap();

        let entry = store.active_block("10.0.0.3", i64::MAX - 1).unwrap().unwrap();
        assert!(entry.is_manual);
        assert_eq!(entry.expires_at, None);

        // Cleanup never removes it.
        assert_eq!(store.remove_expired_auto_blocks(i64::MAX - 1).unwrap(), 0);
        assert!(store.active_block("10.0.0.3", i64::MAX - 1).unwrap().is_some());
    }

    #[test]
    fn expired_auto_blocks_are_swept() {
        let store = Store::open_in_memory().unwrap();
        store.insert_auto_block("10.0.0.4", "rate limit exceeded", 100, 200).unwrap();
        store.insert_auto_block("10.0.0.5", "rate limit exceeded", 100, 900).unwrap();

        assert_eq!(store.remove_expired_auto_blocks(500).unwrap(), 1);
        assert!(store.active_block("10.0.0.5", 500).unwrap().is_some());
    }

    #[test]
    fn unblock_removes_manual_entries() {
        let store = Store::open_in_memory().unwrap();
        store.insert_manual_block("10.0.0.6", "abuse", 100).unwrap();
        assert!(store.remove_block("10.0.0.6").unwrap());
        assert!(!store.remove_block("10.0.0.6").unwrap());
        assert!(store.active_block("10.0.0.6", 101).unwrap().is_none());
    }
}
