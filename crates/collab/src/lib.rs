//! Docket collaborative editing coordination engine (PRD-14).
//!
//! Lets multiple users edit the same document concurrently, arbitrates
//! access through typed locks, detects and reports conflicting edits, and
//! reclaims abandoned sessions and locks through time-based expiry:
//!
//! - [`SessionManager`] — edit session lifecycle (start, end, heartbeat)
//!   gated by document existence and edit permission.
//! - [`LockManager`] — acquisition, release, extension, and listing of
//!   exclusive / shared / region / optimistic document locks.
//! - [`OperationLog`] — append-only edit operation recording with advisory
//!   pairwise conflict classification.
//! - [`StateAggregator`] — read-only "who else is editing" snapshots.
//! - [`CleanupSweep`] — periodic reclamation of idle sessions and expired
//!   lock leases.
//!
//! The engine keeps no in-process state; every operation coordinates
//! through database rows, so any number of stateless replicas can serve
//! requests side by side. Document lookups and audit recording are injected
//! through the [`DocumentDirectory`] and [`AuditSink`] seams.

pub mod audit;
pub mod cleanup;
pub mod config;
pub mod directory;
pub mod error;
pub mod locks;
pub mod operations;
pub mod sessions;
pub mod state;

pub use audit::{AuditSink, DbAuditSink};
pub use cleanup::{CleanupSweep, SweepOutcome};
pub use config::CollabConfig;
pub use directory::{DbDocumentDirectory, DocumentDirectory};
pub use error::{CollabError, CollabResult};
pub use locks::LockManager;
pub use operations::{AppliedOperation, ApplyEditOperation, EditConflict, OperationLog};
pub use sessions::SessionManager;
pub use state::{CollaborationState, StateAggregator};
