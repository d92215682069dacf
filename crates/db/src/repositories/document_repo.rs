//! Existence and permission checks against the platform's `documents` and
//! `document_permissions` tables.
//!
//! The collaboration engine only reads these tables; document CRUD belongs
//! to the wider platform.

use sqlx::PgPool;

use docket_core::types::DbId;

/// Read-only checks over documents and edit grants.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Whether a non-deleted document with this ID exists.
    pub async fn exists(pool: &PgPool, document_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1 AND is_deleted = false)",
        )
        .bind(document_id)
        .fetch_one(pool)
        .await
    }

    /// Whether a user may edit a document: either its owner or the holder
    /// of an explicit edit grant.
    pub async fn has_edit_access(
        pool: &PgPool,
        document_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM documents
                 WHERE id = $1 AND owner_id = $2 AND is_deleted = false
             ) OR EXISTS(
                 SELECT 1 FROM document_permissions
                 WHERE document_id = $1 AND user_id = $2 AND can_edit = true
             )",
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
