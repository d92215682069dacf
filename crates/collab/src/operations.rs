//! Edit operation recording and conflict surfacing (PRD-14).
//!
//! Writes are never blocked or rejected: the engine records every
//! operation, then compares it against recent operations from other
//! sessions on the same document and returns whatever conflicts it finds
//! as advisory findings for the caller to resolve.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use docket_core::conflict::{
    analyze_operation_conflict, ConflictSeverity, ConflictType, EditPosition, OperationType,
};
use docket_core::types::{DbId, Timestamp};
use docket_db::models::collaboration::{CreateEditOperation, EditOperation};
use docket_db::repositories::{EditOperationRepo, EditSessionRepo};
use docket_db::DbPool;

use crate::config::CollabConfig;
use crate::error::{CollabError, CollabResult};

/// Caller-supplied payload for [`OperationLog::apply_edit_operation`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyEditOperation {
    pub operation_type: OperationType,
    pub position: EditPosition,
    #[serde(default)]
    pub content: String,
}

/// A classified collision between a newly recorded operation and a recent
/// one from another session.
#[derive(Debug, Clone, Serialize)]
pub struct EditConflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub operation: EditOperation,
    pub conflicting_operation: EditOperation,
    pub detected_at: Timestamp,
}

/// The recorded operation plus any advisory conflicts.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedOperation {
    pub operation: EditOperation,
    pub conflicts: Vec<EditConflict>,
}

/// Records edit operations and runs the conflict analysis.
pub struct OperationLog {
    pool: DbPool,
    config: CollabConfig,
}

impl OperationLog {
    pub fn new(pool: DbPool, config: CollabConfig) -> Self {
        Self { pool, config }
    }

    /// Record an edit operation through an active session.
    ///
    /// Allocates the document's next sequence number, persists the
    /// operation, refreshes the session's activity timestamp, and
    /// classifies the operation against the recency window of other
    /// sessions' operations.
    pub async fn apply_edit_operation(
        &self,
        session_id: DbId,
        input: ApplyEditOperation,
    ) -> CollabResult<AppliedOperation> {
        let session = EditSessionRepo::find_by_id(&self.pool, session_id)
            .await
            .map_err(|e| CollabError::store("Failed to load edit session", e))?
            .ok_or(CollabError::NotFound {
                entity: "edit session",
                id: session_id,
            })?;
        if !session.is_active {
            return Err(CollabError::SessionInactive { session_id });
        }

        let sequence_number = EditOperationRepo::next_sequence(&self.pool, session.document_id)
            .await
            .map_err(|e| CollabError::store("Failed to allocate operation sequence number", e))?;

        let create = CreateEditOperation {
            session_id,
            document_id: session.document_id,
            user_id: session.user_id,
            operation_type: input.operation_type,
            position: input.position,
            content: input.content,
        };
        let operation = EditOperationRepo::insert(&self.pool, &create, sequence_number)
            .await
            .map_err(|e| CollabError::store("Failed to record edit operation", e))?;

        EditSessionRepo::touch(&self.pool, session_id)
            .await
            .map_err(|e| CollabError::store("Failed to refresh session activity", e))?;

        let recent = EditOperationRepo::recent_for_document(
            &self.pool,
            session.document_id,
            self.config.conflict_window_secs,
            Some(session_id),
        )
        .await
        .map_err(|e| CollabError::store("Failed to load recent operations", e))?;

        let rules = self.config.conflict_rules();
        let footprint = operation.footprint();
        let detected_at = Utc::now();
        let conflicts: Vec<EditConflict> = recent
            .into_iter()
            .filter_map(|other| {
                analyze_operation_conflict(&footprint, &other.footprint(), &rules).map(
                    |finding| EditConflict {
                        conflict_type: finding.conflict_type,
                        severity: finding.severity,
                        operation: operation.clone(),
                        conflicting_operation: other,
                        detected_at,
                    },
                )
            })
            .collect();

        if !conflicts.is_empty() {
            tracing::info!(
                session_id,
                document_id = session.document_id,
                sequence_number,
                conflict_count = conflicts.len(),
                "Concurrent edit conflicts detected"
            );
        }

        Ok(AppliedOperation {
            operation,
            conflicts,
        })
    }
}
