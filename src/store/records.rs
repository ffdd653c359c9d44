//! Sealed link-request records.
//!
//! The crypto triple (ciphertext, iv, tag) is written and read as one row;
//! the columns are never updated independently. Records are never deleted:
//! the anonymization sweep overwrites the triple with a sentinel, truncates
//! the IP, and clears the user agent, keeping the row as anonymized history.

use rusqlite::{params, OptionalExtension, Row};

use crate::crypto::SealedParts;
use crate::store::Store;

/// Sentinel stored in place of the crypto triple once a record has been
/// anonymized. Also the idempotence predicate for the sweep.
pub const ANONYMIZED_SENTINEL: &str = "ANONYMIZED";

/// One stored link-generation request.
#[derive(Debug, Clone)]
pub struct SealedRecord {
    pub id: i64,
    pub sealed: SealedParts,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub link: String,
    pub created_at: i64,
}

impl SealedRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            sealed: SealedParts {
                ciphertext: row.get(1)?,
                iv: row.get(2)?,
                tag: row.get(3)?,
            },
            ip_address: row.get(4)?,
            user_agent: row.get(5)?,
            link: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// A record about to be persisted.
pub struct NewRecord<'a> {
    pub sealed: SealedParts,
    pub ip_address: &'a str,
    pub user_agent: Option<&'a str>,
    pub link: &'a str,
    pub created_at: i64,
}

const COLUMNS: &str = "id, ciphertext, iv, tag, ip_address, user_agent, link, created_at";

impl Store {
    /// Persist a sealed record, returning its row id.
    pub fn insert_record(&self, record: NewRecord<'_>) -> Result<i64, rusqlite::Error> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO link_requests
                 (ciphertext, iv, tag, ip_address, user_agent, link, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.sealed.ciphertext,
                record.sealed.iv,
                record.sealed.tag,
                record.ip_address,
                record.user_agent,
                record.link,
                record.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Point lookup by id.
    pub fn record_by_id(&self, id: i64) -> Result<Option<SealedRecord>, rusqlite::Error> {
        self.lock()
            .query_row(
                &format!("SELECT {COLUMNS} FROM link_requests WHERE id = ?1"),
                params![id],
                SealedRecord::from_row,
            )
            .optional()
    }

    /// Newest-first page of records.
    pub fn record_page(
        &self,
        limit: u32,
        offset: i64,
    ) -> Result<Vec<SealedRecord>, rusqlite::Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM link_requests
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![limit, offset], SealedRecord::from_row)?;
        rows.collect()
    }

    /// Total stored records (anonymized included).
    pub fn count_records(&self) -> Result<i64, rusqlite::Error> {
        self.lock()
            .query_row("SELECT COUNT(*) FROM link_requests", [], |row| row.get(0))
    }

    /// Records created strictly after `since`.
    pub fn count_records_since(&self, since: i64) -> Result<i64, rusqlite::Error> {
        self.lock().query_row(
            "SELECT COUNT(*) FROM link_requests WHERE created_at > ?1",
            params![since],
            |row| row.get(0),
        )
    }

    /// Redact every record older than `cutoff` that is not yet anonymized:
    /// sentinel over the crypto triple, IP truncated to its first octet plus
    /// a wildcard suffix, user agent cleared. One conditional UPDATE, so a
    /// concurrent second sweep matches zero rows instead of double-counting.
    pub fn anonymize_records_before(&self, cutoff: i64) -> Result<usize, rusqlite::Error> {
        self.lock().execute(
            "UPDATE link_requests SET
                 ciphertext = ?1,
                 iv = ?1,
                 tag = ?1,
                 ip_address = CASE
                     WHEN instr(ip_address, '.') > 0
                     THEN substr(ip_address, 1, instr(ip_address, '.') - 1) || '.*.*.*'
                     ELSE '*'
                 END,
                 user_agent = NULL
             WHERE created_at < ?2 AND ciphertext != ?1",
            params![ANONYMIZED_SENTINEL, cutoff],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(ip: &str, created_at: i64) -> NewRecord<'_> {
        NewRecord {
            sealed: SealedParts {
                ciphertext: "aabb".into(),
                iv: "cc".repeat(12),
                tag: "dd".repeat(16),
            },
            ip_address: ip,
            user_agent: Some("test-agent"),
            link: "https://wa.me/15551234567",
            created_at,
        }
    }

    #[test]
    fn insert_and_page_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert_record(sample_record("203.0.113.9", 100)).unwrap();
        store.insert_record(sample_record("203.0.113.9", 200)).unwrap();

        let page = store.record_page(10, 0).unwrap();
        assert_eq!(page.len(), 2);
        // Newest first.
        assert_eq!(page[0].created_at, 200);
        assert_eq!(page[1].id, id);
        assert_eq!(store.count_records().unwrap(), 2);
        assert_eq!(store.count_records_since(150).unwrap(), 1);
    }

    #[test]
    fn anonymization_redacts_old_rows_only() {
        let store = Store::open_in_memory().unwrap();
        let old = store.insert_record(sample_record("203.0.113.9", 100)).unwrap();
        let fresh = store.insert_record(sample_record("198.51.100.7", 900)).unwrap();

        assert_eq!(store.anonymize_records_before(500).unwrap(), 1);

        let old_row = store.record_by_id(old).unwrap().unwrap();
        assert_eq!(old_row.sealed.ciphertext, ANONYMIZED_SENTINEL);
        assert_eq!(old_row.sealed.iv, ANONYMIZED_SENTINEL);
        assert_eq!(old_row.sealed.tag, ANONYMIZED_SENTINEL);
        assert_eq!(old_row.ip_address, "203.*.*.*");
        assert_eq!(old_row.user_agent, None);
        // Non-sensitive metadata survives.
        assert_eq!(old_row.link, "https://wa.me/15551234567");
        assert_eq!(old_row.created_at, 100);

        let fresh_row = store.record_by_id(fresh).unwrap().unwrap();
        assert_eq!(fresh_row.ip_address, "198.51.100.7");
        assert_ne!(fresh_row.sealed.ciphertext, ANONYMIZED_SENTINEL);
    }

    #[test]
    fn anonymization_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.insert_record(sample_record("203.0.113.9", 100)).unwrap();

        assert_eq!(store.anonymize_records_before(500).unwrap(), 1);
        assert_eq!(store.anonymize_records_before(500).unwrap(), 0);
    }

    #[test]
    fn anonymization_handles_addresses_without_dots() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert_record(sample_record("::1", 100)).unwrap();

        store.anonymize_records_before(500).unwrap();
        let row = store.record_by_id(id).unwrap().unwrap();
        assert_eq!(row.ip_address, "*");
    }
}
