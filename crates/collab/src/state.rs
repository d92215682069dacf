//! Aggregated collaboration state for a document (PRD-14).

use serde::Serialize;

use docket_core::conflict::analyze_operation_conflict;
use docket_core::types::DbId;
use docket_db::models::collaboration::{DocumentLock, EditOperation, EditSession};
use docket_db::repositories::{DocumentLockRepo, EditOperationRepo, EditSessionRepo};
use docket_db::DbPool;

use crate::config::CollabConfig;
use crate::error::{CollabError, CollabResult};

/// Snapshot of everything happening on a document right now: who is
/// editing, what changed recently, which locks are held, and how many
/// conflicts the recent operations contain.
#[derive(Debug, Clone, Serialize)]
pub struct CollaborationState {
    pub document_id: DbId,
    pub active_sessions: Vec<EditSession>,
    pub recent_operations: Vec<EditOperation>,
    pub active_locks: Vec<DocumentLock>,
    pub conflict_count: usize,
}

/// Read-only assembly of [`CollaborationState`] snapshots.
pub struct StateAggregator {
    pool: DbPool,
    config: CollabConfig,
}

impl StateAggregator {
    pub fn new(pool: DbPool, config: CollabConfig) -> Self {
        Self { pool, config }
    }

    /// Assemble the current collaboration state for a document.
    ///
    /// Never mutates anything; the conflict count is recomputed over the
    /// pairs of operations inside the recency window.
    pub async fn get_collaboration_state(
        &self,
        document_id: DbId,
    ) -> CollabResult<CollaborationState> {
        let active_sessions = EditSessionRepo::active_for_document(&self.pool, document_id)
            .await
            .map_err(|e| CollabError::store("Failed to load active sessions", e))?;
        let recent_operations = EditOperationRepo::recent_for_document(
            &self.pool,
            document_id,
            self.config.conflict_window_secs,
            None,
        )
        .await
        .map_err(|e| CollabError::store("Failed to load recent operations", e))?;
        let active_locks = DocumentLockRepo::active_for_document(&self.pool, document_id)
            .await
            .map_err(|e| CollabError::store("Failed to load active locks", e))?;

        let rules = self.config.conflict_rules();
        let mut conflict_count = 0;
        for (index, a) in recent_operations.iter().enumerate() {
            for b in &recent_operations[index + 1..] {
                if analyze_operation_conflict(&a.footprint(), &b.footprint(), &rules).is_some() {
                    conflict_count += 1;
                }
            }
        }

        Ok(CollaborationState {
            document_id,
            active_sessions,
            recent_operations,
            active_locks,
            conflict_count,
        })
    }
}
