//! Reclamation of abandoned sessions and expired locks (PRD-14).
//!
//! The sweep is the engine's only self-healing mechanism: a crashed or
//! disconnected client cannot hold an exclusive or region lock past its
//! lease, and cannot keep a session active past the inactivity timeout.
//! Both steps are bulk conditional updates, so the sweep is idempotent and
//! safe to run concurrently from multiple replicas.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use docket_db::repositories::{DocumentLockRepo, EditSessionRepo};
use docket_db::DbPool;

use crate::config::CollabConfig;

/// Counts of rows reclaimed by one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    pub sessions_timed_out: u64,
    pub locks_expired: u64,
}

/// Periodic reclamation of stale sessions and expired lock leases.
pub struct CleanupSweep {
    pool: DbPool,
    config: CollabConfig,
}

impl CleanupSweep {
    pub fn new(pool: DbPool, config: CollabConfig) -> Self {
        Self { pool, config }
    }

    /// Run both reclamation steps once.
    ///
    /// A failed step is logged and does not stop the other, so one bad
    /// batch never blocks reclamation for everything else.
    pub async fn cleanup_expired_sessions(&self) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();

        match EditSessionRepo::cleanup_stale(&self.pool, self.config.session_idle_timeout_mins)
            .await
        {
            Ok(count) => outcome.sessions_timed_out = count,
            Err(e) => tracing::error!(error = %e, "Failed to time out stale edit sessions"),
        }

        match DocumentLockRepo::cleanup_expired(&self.pool).await {
            Ok(count) => outcome.locks_expired = count,
            Err(e) => tracing::error!(error = %e, "Failed to release expired document locks"),
        }

        if outcome != SweepOutcome::default() {
            tracing::info!(
                sessions_timed_out = outcome.sessions_timed_out,
                locks_expired = outcome.locks_expired,
                "Cleanup sweep reclaimed abandoned state"
            );
        }

        outcome
    }

    /// Run the sweep on a fixed interval.
    ///
    /// The loop exits gracefully when the provided [`CancellationToken`]
    /// is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.sweep_interval_secs));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Cleanup sweep cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.cleanup_expired_sessions().await;
                }
            }
        }
    }
}
