//! Repository for the `edit_sessions` table (PRD-14).

use sqlx::PgPool;
use docket_core::types::DbId;

use crate::models::collaboration::{CreateEditSession, EditSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, document_id, user_id, user_name, client_id, lock_type, \
                        started_at, last_activity_at, is_active, ended_at, \
                        end_reason, created_at";

/// Provides CRUD operations for edit sessions.
pub struct EditSessionRepo;

impl EditSessionRepo {
    /// Insert a new active session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEditSession,
    ) -> Result<EditSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO edit_sessions (document_id, user_id, user_name, client_id, lock_type) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EditSession>(&query)
            .bind(input.document_id)
            .bind(input.user_id)
            .bind(&input.user_name)
            .bind(input.client_id)
            .bind(input.lock_type.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a session by its ID, active or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EditSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM edit_sessions WHERE id = $1");
        sqlx::query_as::<_, EditSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Refresh a session's activity timestamp.
    ///
    /// Returns `true` if the session was active and got refreshed.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE edit_sessions SET last_activity_at = NOW() \
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// End an active session with the given reason.
    ///
    /// Returns the ended row, or `None` if the session was already inactive.
    pub async fn end(
        pool: &PgPool,
        id: DbId,
        reason: &str,
    ) -> Result<Option<EditSession>, sqlx::Error> {
        let query = format!(
            "UPDATE edit_sessions SET is_active = false, ended_at = NOW(), end_reason = $2 \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EditSession>(&query)
            .bind(id)
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Get all currently active sessions for a document.
    pub async fn active_for_document(
        pool: &PgPool,
        document_id: DbId,
    ) -> Result<Vec<EditSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM edit_sessions \
             WHERE document_id = $1 AND is_active = true \
             ORDER BY started_at ASC"
        );
        sqlx::query_as::<_, EditSession>(&query)
            .bind(document_id)
            .fetch_all(pool)
            .await
    }

    /// Time out every active session idle for longer than `idle_mins`.
    /// Returns the number of sessions reclaimed.
    pub async fn cleanup_stale(pool: &PgPool, idle_mins: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE edit_sessions \
             SET is_active = false, ended_at = NOW(), end_reason = 'timeout' \
             WHERE is_active = true \
               AND last_activity_at < NOW() - ($1 || ' minutes')::interval",
        )
        .bind(idle_mins.to_string())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
