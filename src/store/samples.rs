//! Rate-window sample operations.
//!
//! Samples are append-only and ephemeral: the limiter only counts and
//! inserts, never deletes. Pruning belongs to the cleanup sweep so the hot
//! path never pays for table scans.

use rusqlite::params;

use crate::store::Store;

impl Store {
    /// Range scan: samples for `ip` strictly newer than `since`.
    pub fn count_samples_since(&self, ip: &str, since: i64) -> Result<i64, rusqlite::Error> {
        self.lock().query_row(
            "SELECT COUNT(*) FROM rate_limit_tracking
             WHERE ip_address = ?1 AND requested_at > ?2",
            params![ip, since],
            |row| row.get(0),
        )
    }

    /// Append one sample for `ip` at `now`.
    pub fn insert_sample(&self, ip: &str, now: i64) -> Result<(), rusqlite::Error> {
        self.lock().execute(
            "INSERT INTO rate_limit_tracking (ip_address, requested_at) VALUES (?1, ?2)",
            params![ip, now],
        )?;
        Ok(())
    }

    /// Delete samples older than `cutoff`. Returns the number removed.
    pub fn prune_samples_before(&self, cutoff: i64) -> Result<usize, rusqlite::Error> {
        self.lock().execute(
            "DELETE FROM rate_limit_tracking WHERE requested_at < ?1",
            params![cutoff],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_respects_the_window_edge() {
        let store = Store::open_in_memory().unwrap();
        store.insert_sample("10.0.0.1", 100).unwrap();
        store.insert_sample("10.0.0.1", 160).unwrap();
        store.insert_sample("10.0.0.2", 160).unwrap();

        // Sample exactly at the edge is outside the trailing window.
        assert_eq!(store.count_samples_since("10.0.0.1", 100).unwrap(), 1);
        assert_eq!(store.count_samples_since("10.0.0.1", 99).unwrap(), 2);
    }

    #[test]
    fn pruning_removes_only_old_samples() {
        let store = Store::open_in_memory().unwrap();
        store.insert_sample("10.0.0.1", 100).unwrap();
        store.insert_sample("10.0.0.1", 400).unwrap();

        assert_eq!(store.prune_samples_before(300).unwrap(), 1);
        assert_eq!(store.count_samples_since("10.0.0.1", 0).unwrap(), 1);
    }
}
