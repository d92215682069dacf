//! Repository for the `document_locks` table (PRD-14).
//!
//! Lock acquisition is check-then-insert and must see a consistent snapshot
//! of the active locks, so it runs in a transaction holding a row lock on
//! the document. The partial unique index on active exclusive locks backs
//! the same invariant at the schema level.

use sqlx::types::Json;
use sqlx::PgPool;

use docket_core::collaboration::find_lock_conflict;
use docket_core::types::DbId;

use crate::models::collaboration::{CreateDocumentLock, DocumentLock};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, document_id, user_id, lock_type, region, acquired_at, \
                        expires_at, is_active, released_at, release_reason, created_at";

/// Result of an acquisition attempt.
#[derive(Debug)]
pub enum LockAcquireOutcome {
    /// The lock was granted.
    Acquired(DocumentLock),
    /// An incompatible active lock is in the way.
    Conflict(DocumentLock),
    /// The document does not exist (or is deleted).
    DocumentMissing,
}

/// Provides acquisition, release, and expiry operations for document locks.
pub struct DocumentLockRepo;

impl DocumentLockRepo {
    /// Attempt to acquire a lock, serialized against concurrent attempts on
    /// the same document.
    ///
    /// Takes `FOR UPDATE` on the documents row so two acquisitions for one
    /// document never evaluate the conflict rule against the same snapshot,
    /// then inserts with `expires_at` a lease ahead of now.
    pub async fn acquire(
        pool: &PgPool,
        input: &CreateDocumentLock,
        lease_mins: i64,
    ) -> Result<LockAcquireOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let document: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM documents WHERE id = $1 AND is_deleted = false FOR UPDATE",
        )
        .bind(input.document_id)
        .fetch_optional(&mut *tx)
        .await?;
        if document.is_none() {
            return Ok(LockAcquireOutcome::DocumentMissing);
        }

        let select_active = format!(
            "SELECT {COLUMNS} FROM document_locks \
             WHERE document_id = $1 AND is_active = true"
        );
        let active = sqlx::query_as::<_, DocumentLock>(&select_active)
            .bind(input.document_id)
            .fetch_all(&mut *tx)
            .await?;

        let held: Vec<_> = active.iter().filter_map(DocumentLock::as_held).collect();
        if let Some(blocking) =
            find_lock_conflict(input.lock_type, input.region.as_ref(), &held)
        {
            let row = active
                .iter()
                .find(|lock| lock.id == blocking.id)
                .cloned()
                .ok_or(sqlx::Error::RowNotFound)?;
            return Ok(LockAcquireOutcome::Conflict(row));
        }

        let insert = format!(
            "INSERT INTO document_locks (document_id, user_id, lock_type, region, expires_at) \
             VALUES ($1, $2, $3, $4, NOW() + ($5 || ' minutes')::interval) \
             RETURNING {COLUMNS}"
        );
        let lock = sqlx::query_as::<_, DocumentLock>(&insert)
            .bind(input.document_id)
            .bind(input.user_id)
            .bind(input.lock_type.as_str())
            .bind(input.region.clone().map(Json))
            .bind(lease_mins.to_string())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(LockAcquireOutcome::Acquired(lock))
    }

    /// Find a lock by its ID, active or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DocumentLock>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM document_locks WHERE id = $1");
        sqlx::query_as::<_, DocumentLock>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Release an active lock with the given reason.
    ///
    /// Returns the released row, or `None` if the lock was already inactive.
    pub async fn release(
        pool: &PgPool,
        id: DbId,
        reason: &str,
    ) -> Result<Option<DocumentLock>, sqlx::Error> {
        let query = format!(
            "UPDATE document_locks \
             SET is_active = false, released_at = NOW(), release_reason = $2 \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentLock>(&query)
            .bind(id)
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Extend an active lock's lease to a full duration from now.
    ///
    /// Returns the updated row, or `None` if the lock is no longer active.
    pub async fn extend(
        pool: &PgPool,
        id: DbId,
        lease_mins: i64,
    ) -> Result<Option<DocumentLock>, sqlx::Error> {
        let query = format!(
            "UPDATE document_locks \
             SET expires_at = NOW() + ($2 || ' minutes')::interval \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentLock>(&query)
            .bind(id)
            .bind(lease_mins.to_string())
            .fetch_optional(pool)
            .await
    }

    /// Get all currently active locks for a document.
    pub async fn active_for_document(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Vec<DocumentLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM document_locks \
             WHERE document_id = $1 AND is_active = true \
             ORDER BY acquired_at ASC"
        );
        sqlx::query_as::<_, DocumentLock>(&query)
            .bind(document_id)
            .fetch_all(pool)
            .await
    }

    /// Release all expired active locks. Returns the number of locks released.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE document_locks \
             SET is_active = false, released_at = NOW(), release_reason = 'expired' \
             WHERE is_active = true AND expires_at < NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
