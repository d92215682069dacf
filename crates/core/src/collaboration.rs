//! Collaborative editing constants, lock typing, and lock-compatibility
//! rules (PRD-14).
//!
//! This module lives in `core` (zero internal deps) so that the persistence
//! layer, the collaboration engine, and worker tooling all reference the
//! same lease durations, lock types, and conflict rules.

use serde::{Deserialize, Serialize};

use crate::region::LockRegion;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Lease and timeout constants
// ---------------------------------------------------------------------------

/// Default lock lease duration in minutes (30 minutes).
pub const DEFAULT_LOCK_LEASE_MINS: i64 = 30;

/// Maximum allowed lock lease duration in minutes (4 hours).
pub const MAX_LOCK_LEASE_MINS: i64 = 240;

/// Minimum lock lease duration in minutes (1 minute).
pub const MIN_LOCK_LEASE_MINS: i64 = 1;

/// Edit sessions with no activity for this many minutes are reclaimed.
pub const SESSION_IDLE_TIMEOUT_MINS: i64 = 30;

/// How often the stale-session/lock cleanup sweep runs (in seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Lock types
// ---------------------------------------------------------------------------

/// Access mode requested for a document lock.
///
/// Stored in the `document_locks.lock_type` column as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// Sole access to the whole document; excludes every other lock.
    Exclusive,
    /// Read-mostly access; coexists with everything except exclusive.
    Shared,
    /// Pessimistic access to a sub-range of the document.
    Region,
    /// Default mode: no pessimistic claim, conflicts detected after the fact.
    Optimistic,
}

impl LockType {
    /// The lowercase column value for this lock type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Exclusive => "exclusive",
            LockType::Shared => "shared",
            LockType::Region => "region",
            LockType::Optimistic => "optimistic",
        }
    }

    /// Parse a column value back into a lock type.
    pub fn parse(value: &str) -> Option<LockType> {
        match value {
            "exclusive" => Some(LockType::Exclusive),
            "shared" => Some(LockType::Shared),
            "region" => Some(LockType::Region),
            "optimistic" => Some(LockType::Optimistic),
            _ => None,
        }
    }

    /// Whether starting an edit session with this lock type must first
    /// acquire a lock row. Optimistic sessions claim nothing up front.
    pub fn requires_acquisition(&self) -> bool {
        !matches!(self, LockType::Optimistic)
    }
}

// ---------------------------------------------------------------------------
// Session end / lock release reasons
// ---------------------------------------------------------------------------

/// Values stored in `edit_sessions.end_reason`.
pub mod end_reasons {
    /// The session owner ended the session.
    pub const MANUAL: &str = "manual";
    /// The cleanup sweep reclaimed the session after inactivity.
    pub const TIMEOUT: &str = "timeout";
}

/// Values stored in `document_locks.release_reason`.
pub mod release_reasons {
    /// The lock holder released the lock.
    pub const MANUAL: &str = "manual";
    /// The cleanup sweep reclaimed the lock after its lease lapsed.
    pub const EXPIRED: &str = "expired";
}

// ---------------------------------------------------------------------------
// Lock compatibility
// ---------------------------------------------------------------------------

/// An active lock as seen by the compatibility check: just the fields the
/// rule needs, independent of the storage row shape.
#[derive(Debug, Clone)]
pub struct HeldLock {
    pub id: DbId,
    pub user_id: DbId,
    pub lock_type: LockType,
    pub region: Option<LockRegion>,
}

/// Find the first active lock incompatible with a new request, if any.
///
/// The rule, evaluated against every active lock on the document:
/// - an active exclusive lock blocks every request;
/// - an exclusive request is blocked by any active lock;
/// - a region request is additionally blocked by an active region lock
///   whose region overlaps the requested one;
/// - shared and optimistic requests pass everything but exclusive.
pub fn find_lock_conflict<'a>(
    requested: LockType,
    region: Option<&LockRegion>,
    held: &'a [HeldLock],
) -> Option<&'a HeldLock> {
    held.iter().find(|lock| {
        if lock.lock_type == LockType::Exclusive {
            return true;
        }
        match requested {
            LockType::Exclusive => true,
            LockType::Region => {
                lock.lock_type == LockType::Region
                    && match (region, lock.region.as_ref()) {
                        (Some(a), Some(b)) => a.overlaps(b),
                        _ => false,
                    }
            }
            LockType::Shared | LockType::Optimistic => false,
        }
    })
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a lock lease duration in minutes. Returns `Ok(())` or an error
/// message.
pub fn validate_lease_mins(minutes: i64) -> Result<(), String> {
    if minutes < MIN_LOCK_LEASE_MINS {
        return Err(format!(
            "Lock lease must be at least {MIN_LOCK_LEASE_MINS} minute(s), got {minutes}"
        ));
    }
    if minutes > MAX_LOCK_LEASE_MINS {
        return Err(format!(
            "Lock lease must be at most {MAX_LOCK_LEASE_MINS} minutes, got {minutes}"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
