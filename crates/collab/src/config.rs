//! Engine tunables.

use docket_core::collaboration::{
    DEFAULT_LOCK_LEASE_MINS, SESSION_IDLE_TIMEOUT_MINS, SWEEP_INTERVAL_SECS,
};
use docket_core::conflict::{
    ConflictRules, DEFAULT_CONFLICT_LINE_DISTANCE, DEFAULT_CONFLICT_WINDOW_SECS,
};

/// Tunable parameters of the collaboration engine.
///
/// The conflict bounds are deliberately configuration rather than
/// constants: the right "nearby" line distance and comparison window vary
/// by document type and editing cadence.
#[derive(Debug, Clone)]
pub struct CollabConfig {
    /// Lease granted to new and extended locks, in minutes.
    pub lock_lease_mins: i64,
    /// Inactivity after which the sweep reclaims a session, in minutes.
    pub session_idle_timeout_mins: i64,
    /// Window within which operations are compared for conflicts, in seconds.
    pub conflict_window_secs: i64,
    /// Line distance within which concurrent edits are flagged as nearby.
    pub conflict_line_distance: i64,
    /// Interval between cleanup sweep runs, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            lock_lease_mins: DEFAULT_LOCK_LEASE_MINS,
            session_idle_timeout_mins: SESSION_IDLE_TIMEOUT_MINS,
            conflict_window_secs: DEFAULT_CONFLICT_WINDOW_SECS,
            conflict_line_distance: DEFAULT_CONFLICT_LINE_DISTANCE,
            sweep_interval_secs: SWEEP_INTERVAL_SECS,
        }
    }
}

impl CollabConfig {
    /// The pairwise comparison bounds derived from this configuration.
    pub fn conflict_rules(&self) -> ConflictRules {
        ConflictRules {
            recency_window_secs: self.conflict_window_secs,
            line_distance: self.conflict_line_distance,
        }
    }
}
