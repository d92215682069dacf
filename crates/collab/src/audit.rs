//! Audit recording seam (PRD-27).
//!
//! Audit entries are best-effort from the engine's point of view: a failed
//! write is logged by the caller and never fails the operation it annotates.

use async_trait::async_trait;

use docket_core::types::DbId;
use docket_db::models::audit::CreateAuditLog;
use docket_db::repositories::AuditLogRepo;
use docket_db::DbPool;

/// Destination for audit entries emitted by the engine.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one audit entry.
    async fn record_audit(
        &self,
        entity_type: &str,
        entity_id: DbId,
        action: &str,
        details: serde_json::Value,
        user_id: DbId,
    ) -> anyhow::Result<()>;
}

/// Sink writing to the platform's `audit_logs` table.
pub struct DbAuditSink {
    pool: DbPool,
}

impl DbAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn record_audit(
        &self,
        entity_type: &str,
        entity_id: DbId,
        action: &str,
        details: serde_json::Value,
        user_id: DbId,
    ) -> anyhow::Result<()> {
        AuditLogRepo::insert(
            &self.pool,
            &CreateAuditLog {
                user_id: Some(user_id),
                action_type: action.to_string(),
                entity_type: Some(entity_type.to_string()),
                entity_id: Some(entity_id),
                details_json: Some(details),
            },
        )
        .await?;
        Ok(())
    }
}
