//! Edit session lifecycle (PRD-14).
//!
//! A session is one user's active editing context on one document. Starting
//! a session is gated by document existence and edit permission; sessions
//! under a pessimistic lock type acquire their lock before the session row
//! exists, so a refused lock never leaves an orphaned session behind.

use std::sync::Arc;

use docket_core::audit::{action_types, entity_types};
use docket_core::collaboration::end_reasons;
use docket_core::types::DbId;
use docket_db::models::collaboration::{CreateEditSession, EditSession};
use docket_db::repositories::EditSessionRepo;
use docket_db::DbPool;

use crate::audit::AuditSink;
use crate::config::CollabConfig;
use crate::directory::DocumentDirectory;
use crate::error::{CollabError, CollabResult};
use crate::locks::LockManager;

/// Manages edit session lifecycles.
pub struct SessionManager {
    pool: DbPool,
    directory: Arc<dyn DocumentDirectory>,
    audit: Arc<dyn AuditSink>,
    locks: LockManager,
}

impl SessionManager {
    pub fn new(
        pool: DbPool,
        directory: Arc<dyn DocumentDirectory>,
        audit: Arc<dyn AuditSink>,
        config: CollabConfig,
    ) -> Self {
        let locks = LockManager::new(pool.clone(), config);
        Self {
            pool,
            directory,
            audit,
            locks,
        }
    }

    /// The lock manager this session manager acquires through.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Start an edit session on a document.
    ///
    /// Checks document existence and edit permission through the injected
    /// directory. For exclusive, shared, and region sessions the lock is
    /// acquired first and its failure aborts the start entirely. The audit
    /// entry is best-effort.
    pub async fn start_edit_session(&self, input: CreateEditSession) -> CollabResult<EditSession> {
        let exists = self
            .directory
            .document_exists(input.document_id)
            .await
            .map_err(|e| CollabError::store("Failed to check document existence", e))?;
        if !exists {
            return Err(CollabError::NotFound {
                entity: "document",
                id: input.document_id,
            });
        }

        let allowed = self
            .directory
            .has_edit_access(input.document_id, input.user_id)
            .await
            .map_err(|e| CollabError::store("Failed to check edit access", e))?;
        if !allowed {
            return Err(CollabError::AccessDenied(format!(
                "User {} may not edit document {}",
                input.user_id, input.document_id
            )));
        }

        if input.lock_type.requires_acquisition() {
            self.locks
                .acquire_document_lock(
                    input.document_id,
                    input.user_id,
                    input.lock_type,
                    input.region.clone(),
                )
                .await?;
        }

        let session = EditSessionRepo::create(&self.pool, &input)
            .await
            .map_err(|e| CollabError::store("Failed to start edit session", e))?;

        tracing::info!(
            session_id = session.id,
            document_id = session.document_id,
            user_id = session.user_id,
            lock_type = %session.lock_type,
            "Edit session started"
        );

        if let Err(e) = self
            .audit
            .record_audit(
                entity_types::EDIT_SESSION,
                session.id,
                action_types::START,
                serde_json::json!({
                    "document_id": session.document_id,
                    "client_id": session.client_id,
                    "lock_type": session.lock_type,
                }),
                session.user_id,
            )
            .await
        {
            tracing::warn!(
                session_id = session.id,
                error = %e,
                "Failed to record session start audit entry"
            );
        }

        Ok(session)
    }

    /// End an edit session. Only the owner may end their own session.
    ///
    /// Locks held by the user are NOT released here; lock and session
    /// lifecycles are independent and the lease bounds any leftover claim.
    pub async fn end_edit_session(
        &self,
        session_id: DbId,
        user_id: DbId,
    ) -> CollabResult<EditSession> {
        self.find_owned_session(session_id, user_id).await?;

        let ended = EditSessionRepo::end(&self.pool, session_id, end_reasons::MANUAL)
            .await
            .map_err(|e| CollabError::store("Failed to end edit session", e))?
            .ok_or(CollabError::SessionInactive { session_id })?;

        tracing::info!(
            session_id,
            document_id = ended.document_id,
            user_id,
            "Edit session ended"
        );

        if let Err(e) = self
            .audit
            .record_audit(
                entity_types::EDIT_SESSION,
                ended.id,
                action_types::END,
                serde_json::json!({
                    "document_id": ended.document_id,
                    "end_reason": end_reasons::MANUAL,
                }),
                user_id,
            )
            .await
        {
            tracing::warn!(
                session_id,
                error = %e,
                "Failed to record session end audit entry"
            );
        }

        Ok(ended)
    }

    /// Refresh a session's activity timestamp without recording an edit,
    /// so an open-but-idle editor is not reclaimed by the sweep. Only the
    /// owner may heartbeat their own session.
    pub async fn heartbeat(&self, session_id: DbId, user_id: DbId) -> CollabResult<()> {
        self.find_owned_session(session_id, user_id).await?;

        let touched = EditSessionRepo::touch(&self.pool, session_id)
            .await
            .map_err(|e| CollabError::store("Failed to refresh session activity", e))?;
        if !touched {
            return Err(CollabError::SessionInactive { session_id });
        }
        Ok(())
    }

    /// Look up a session and verify the caller owns it.
    async fn find_owned_session(
        &self,
        session_id: DbId,
        user_id: DbId,
    ) -> CollabResult<EditSession> {
        let session = EditSessionRepo::find_by_id(&self.pool, session_id)
            .await
            .map_err(|e| CollabError::store("Failed to load edit session", e))?
            .ok_or(CollabError::NotFound {
                entity: "edit session",
                id: session_id,
            })?;
        if session.user_id != user_id {
            return Err(CollabError::AccessDenied(format!(
                "Session {session_id} belongs to another user"
            )));
        }
        Ok(session)
    }
}
