//! Document existence and edit-permission checks.
//!
//! The engine never owns document CRUD; it asks an injected
//! [`DocumentDirectory`] before starting sessions. The default
//! implementation reads the platform's own tables, but deployments that
//! keep permissions elsewhere can plug in their own.

use async_trait::async_trait;

use docket_core::types::DbId;
use docket_db::repositories::DocumentRepo;
use docket_db::DbPool;

/// Where documents live and who may edit them.
#[async_trait]
pub trait DocumentDirectory: Send + Sync {
    /// Whether a non-deleted document with this ID exists.
    async fn document_exists(&self, document_id: DbId) -> anyhow::Result<bool>;

    /// Whether the user may edit the document (ownership or explicit grant).
    async fn has_edit_access(&self, document_id: DbId, user_id: DbId) -> anyhow::Result<bool>;
}

/// Directory backed by the platform's `documents` and
/// `document_permissions` tables.
pub struct DbDocumentDirectory {
    pool: DbPool,
}

impl DbDocumentDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentDirectory for DbDocumentDirectory {
    async fn document_exists(&self, document_id: DbId) -> anyhow::Result<bool> {
        Ok(DocumentRepo::exists(&self.pool, document_id).await?)
    }

    async fn has_edit_access(&self, document_id: DbId, user_id: DbId) -> anyhow::Result<bool> {
        Ok(DocumentRepo::has_edit_access(&self.pool, document_id, user_id).await?)
    }
}
