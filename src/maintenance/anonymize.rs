//! Scheduled PII anonymization.
//!
//! Sweeps the record store, redacting everything older than the retention
//! period: sentinel over the crypto triple, IP truncated to its first octet,
//! user agent cleared. The whole sweep is one conditional UPDATE whose
//! predicate excludes already-anonymized rows, so re-runs and concurrent
//! runs affect zero rows instead of double-counting.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::RetentionConfig;
use crate::store::Store;

const DAY_SECS: i64 = 24 * 60 * 60;

pub struct Anonymizer {
    store: Store,
    retention_days: u32,
}

impl Anonymizer {
    pub fn new(store: Store, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Redact all eligible records as of `now`. Returns the rows affected.
    pub fn sweep(&self, now: i64) -> Result<usize, rusqlite::Error> {
        let cutoff = now - i64::from(self.retention_days) * DAY_SECS;
        self.store.anonymize_records_before(cutoff)
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Periodic loop: one sweep shortly after startup, then on the fixed
    /// interval, until shutdown. Errors are logged per tick and the loop
    /// carries on.
    pub async fn run(self: std::sync::Arc<Self>, config: RetentionConfig, mut shutdown: broadcast::Receiver<()>) {
        let start = tokio::time::Instant::now() + Duration::from_secs(config.startup_delay_secs);
        let mut interval =
            tokio::time::interval_at(start, Duration::from_secs(config.sweep_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep(Utc::now().timestamp()) {
                        Ok(0) => {}
                        Ok(affected) => {
                            tracing::info!(
                                affected,
                                retention_days = self.retention_days,
                                "anonymization sweep finished"
                            );
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "anonymization sweep failed; will retry next tick");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("anonymization task stopping");
                    break;
                }
            }
        }
    }
}
