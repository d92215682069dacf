//! Repository for the append-only `edit_operations` table and its
//! per-document sequence counter (PRD-14).

use sqlx::PgPool;

use docket_core::types::DbId;

use crate::models::collaboration::{CreateEditOperation, EditOperation};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, document_id, user_id, operation_type, \
                        position_line, position_character, content, \
                        sequence_number, recorded_at";

/// Provides insert and query operations for edit operations.
pub struct EditOperationRepo;

impl EditOperationRepo {
    /// Allocate the next sequence number for a document.
    ///
    /// Atomic upsert against `edit_sequences`: the first operation on a
    /// document creates the counter row at 1, every later call bumps it.
    /// Safe under concurrent callers; numbers are strictly increasing,
    /// with gaps possible when a caller aborts after allocation.
    pub async fn next_sequence(pool: &PgPool, document_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO edit_sequences (document_id, last_sequence) VALUES ($1, 1) \
             ON CONFLICT (document_id) \
             DO UPDATE SET last_sequence = edit_sequences.last_sequence + 1 \
             RETURNING last_sequence",
        )
        .bind(document_id)
        .fetch_one(pool)
        .await
    }

    /// Insert a new operation with a previously allocated sequence number.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateEditOperation,
        sequence_number: i64,
    ) -> Result<EditOperation, sqlx::Error> {
        let query = format!(
            "INSERT INTO edit_operations \
                (session_id, document_id, user_id, operation_type, \
                 position_line, position_character, content, sequence_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EditOperation>(&query)
            .bind(input.session_id)
            .bind(input.document_id)
            .bind(input.user_id)
            .bind(input.operation_type.as_str())
            .bind(input.position.line)
            .bind(input.position.character)
            .bind(&input.content)
            .bind(sequence_number)
            .fetch_one(pool)
            .await
    }

    /// Get operations recorded for a document within the last `window_secs`
    /// seconds, oldest first, optionally excluding one session's own
    /// operations.
    pub async fn recent_for_document(
        pool: &PgPool,
        document_id: DbId,
        window_secs: i64,
        exclude_session: Option<DbId>,
    ) -> Result<Vec<EditOperation>, sqlx::Error> {
        match exclude_session {
            Some(session_id) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM edit_operations \
                     WHERE document_id = $1 \
                       AND recorded_at >= NOW() - ($2 || ' seconds')::interval \
                       AND session_id <> $3 \
                     ORDER BY recorded_at ASC"
                );
                sqlx::query_as::<_, EditOperation>(&query)
                    .bind(document_id)
                    .bind(window_secs.to_string())
                    .bind(session_id)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM edit_operations \
                     WHERE document_id = $1 \
                       AND recorded_at >= NOW() - ($2 || ' seconds')::interval \
                     ORDER BY recorded_at ASC"
                );
                sqlx::query_as::<_, EditOperation>(&query)
                    .bind(document_id)
                    .bind(window_secs.to_string())
                    .fetch_all(pool)
                    .await
            }
        }
    }
}
