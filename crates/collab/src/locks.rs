//! Typed document locks: acquisition, release, extension (PRD-14).
//!
//! The document itself is never locked by default; exclusive, shared, and
//! region locks are opt-in pessimistic mechanisms for callers that need
//! stronger guarantees than after-the-fact conflict detection. Only the
//! holder may release or extend a lock; abandoned leases are reclaimed by
//! the cleanup sweep.

use docket_core::collaboration::{release_reasons, LockType};
use docket_core::region::{validate_region, LockRegion};
use docket_core::types::DbId;
use docket_db::models::collaboration::{CreateDocumentLock, DocumentLock};
use docket_db::repositories::{DocumentLockRepo, LockAcquireOutcome};
use docket_db::DbPool;

use crate::config::CollabConfig;
use crate::error::{CollabError, CollabResult};

/// Arbitrates lock access per document.
#[derive(Clone)]
pub struct LockManager {
    pool: DbPool,
    config: CollabConfig,
}

impl LockManager {
    pub fn new(pool: DbPool, config: CollabConfig) -> Self {
        Self { pool, config }
    }

    /// Attempt to acquire a lock on a document.
    ///
    /// Region requests must carry a region with at least one complete
    /// dimension; the region argument is ignored for every other lock
    /// type. Fails with [`CollabError::LockConflict`] when an incompatible
    /// active lock exists.
    pub async fn acquire_document_lock(
        &self,
        document_id: DbId,
        user_id: DbId,
        lock_type: LockType,
        region: Option<LockRegion>,
    ) -> CollabResult<DocumentLock> {
        let region = match lock_type {
            LockType::Region => {
                let region = region.ok_or_else(|| {
                    CollabError::Validation(format!(
                        "Region lock on document {document_id} requires a region"
                    ))
                })?;
                validate_region(&region).map_err(CollabError::Validation)?;
                Some(region)
            }
            _ => None,
        };

        let input = CreateDocumentLock {
            document_id,
            user_id,
            lock_type,
            region,
        };
        let outcome = DocumentLockRepo::acquire(&self.pool, &input, self.config.lock_lease_mins)
            .await
            .map_err(|e| CollabError::store("Failed to acquire document lock", e))?;

        match outcome {
            LockAcquireOutcome::Acquired(lock) => {
                tracing::info!(
                    document_id,
                    user_id,
                    lock_id = lock.id,
                    lock_type = lock_type.as_str(),
                    expires_at = %lock.expires_at,
                    "Document lock acquired"
                );
                Ok(lock)
            }
            LockAcquireOutcome::Conflict(blocking) => Err(CollabError::LockConflict(
                conflict_message(document_id, lock_type, &blocking),
            )),
            LockAcquireOutcome::DocumentMissing => Err(CollabError::NotFound {
                entity: "document",
                id: document_id,
            }),
        }
    }

    /// Release a lock. Only the holder may release.
    pub async fn release_document_lock(
        &self,
        lock_id: DbId,
        user_id: DbId,
    ) -> CollabResult<DocumentLock> {
        let lock = self.find_owned_lock(lock_id, user_id).await?;

        let released = DocumentLockRepo::release(&self.pool, lock.id, release_reasons::MANUAL)
            .await
            .map_err(|e| CollabError::store("Failed to release document lock", e))?
            .ok_or_else(|| {
                CollabError::Validation(format!("Lock {lock_id} is no longer active"))
            })?;

        tracing::info!(
            lock_id,
            user_id,
            document_id = released.document_id,
            "Document lock released"
        );
        Ok(released)
    }

    /// Extend a held lock's lease to a full duration from now. Only the
    /// holder may extend.
    pub async fn extend_document_lock(
        &self,
        lock_id: DbId,
        user_id: DbId,
    ) -> CollabResult<DocumentLock> {
        let lock = self.find_owned_lock(lock_id, user_id).await?;

        let extended = DocumentLockRepo::extend(&self.pool, lock.id, self.config.lock_lease_mins)
            .await
            .map_err(|e| CollabError::store("Failed to extend document lock", e))?
            .ok_or_else(|| {
                CollabError::Validation(format!("Lock {lock_id} is no longer active"))
            })?;

        tracing::debug!(
            lock_id,
            user_id,
            new_expires_at = %extended.expires_at,
            "Document lock extended"
        );
        Ok(extended)
    }

    /// Get all currently active locks on a document.
    pub async fn active_locks(&self, document_id: DbId) -> CollabResult<Vec<DocumentLock>> {
        DocumentLockRepo::active_for_document(&self.pool, document_id)
            .await
            .map_err(|e| CollabError::store("Failed to load active locks", e))
    }

    /// Look up a lock and verify the caller holds it.
    async fn find_owned_lock(&self, lock_id: DbId, user_id: DbId) -> CollabResult<DocumentLock> {
        let lock = DocumentLockRepo::find_by_id(&self.pool, lock_id)
            .await
            .map_err(|e| CollabError::store("Failed to load document lock", e))?
            .ok_or(CollabError::NotFound {
                entity: "document lock",
                id: lock_id,
            })?;
        if lock.user_id != user_id {
            return Err(CollabError::AccessDenied(format!(
                "Lock {lock_id} is held by another user"
            )));
        }
        Ok(lock)
    }
}

/// Build the human-readable reason for a refused acquisition.
fn conflict_message(document_id: DbId, requested: LockType, blocking: &DocumentLock) -> String {
    if blocking.lock_type == LockType::Exclusive.as_str() {
        return format!(
            "Document {document_id} has an exclusive lock held by user {} until {}",
            blocking.user_id, blocking.expires_at
        );
    }
    match requested {
        LockType::Exclusive => format!(
            "Document {document_id} already has an active {} lock held by user {}",
            blocking.lock_type, blocking.user_id
        ),
        LockType::Region => format!(
            "Requested region overlaps an active region lock held by user {} on document {document_id}",
            blocking.user_id
        ),
        // Shared/optimistic requests are only ever blocked by an exclusive
        // lock, which the branch above reports.
        _ => format!(
            "Document {document_id} has a conflicting {} lock held by user {}",
            blocking.lock_type, blocking.user_id
        ),
    }
}
