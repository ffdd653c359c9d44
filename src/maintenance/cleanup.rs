//! Rate-limit bookkeeping cleanup.
//!
//! Deletes window samples past their retention and automatic blocks past
//! their expiry. Manual blocks are never touched. Session pruning rides the
//! same tick since it has the same cadence and cost profile.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::session::SessionStore;
use crate::store::Store;

/// Delay before the first cleanup after startup.
const STARTUP_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub samples_removed: usize,
    pub blocks_removed: usize,
    pub sessions_removed: usize,
}

pub struct CleanupTask {
    store: Store,
    sessions: SessionStore,
    config: RateLimitConfig,
}

impl CleanupTask {
    pub fn new(store: Store, sessions: SessionStore, config: RateLimitConfig) -> Self {
        Self {
            store,
            sessions,
            config,
        }
    }

    /// One synchronous sweep at `now`.
    pub fn run_once(&self, now: i64) -> Result<CleanupStats, rusqlite::Error> {
        let sample_cutoff = now - self.config.sample_retention_secs as i64;
        let samples_removed = self.store.prune_samples_before(sample_cutoff)?;
        let blocks_removed = self.store.remove_expired_auto_blocks(now)?;
        let sessions_removed = self.sessions.prune_expired();

        Ok(CleanupStats {
            samples_removed,
            blocks_removed,
            sessions_removed,
        })
    }

    /// Periodic loop. Ticks until the shutdown signal fires; a failed tick
    /// logs and waits for the next one.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let period = Duration::from_secs(self.config.cleanup_interval_secs);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + STARTUP_DELAY, period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once(Utc::now().timestamp()) {
                        Ok(stats) if stats != CleanupStats::default() => {
                            tracing::debug!(
                                samples = stats.samples_removed,
                                blocks = stats.blocks_removed,
                                sessions = stats.sessions_removed,
                                "cleanup sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "cleanup sweep failed; will retry next tick");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("cleanup task stopping");
                    break;
                }
            }
        }
    }
}
