//! Edit session, document lock, and edit operation models and DTOs (PRD-14).

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use docket_core::collaboration::{HeldLock, LockType};
use docket_core::conflict::{EditPosition, OperationFootprint, OperationType};
use docket_core::region::LockRegion;
use docket_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// EditSession
// ---------------------------------------------------------------------------

/// A row from the `edit_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EditSession {
    pub id: DbId,
    pub document_id: DbId,
    pub user_id: DbId,
    pub user_name: String,
    pub client_id: Uuid,
    pub lock_type: String,
    pub started_at: Timestamp,
    pub last_activity_at: Timestamp,
    pub is_active: bool,
    pub ended_at: Option<Timestamp>,
    pub end_reason: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for starting an edit session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEditSession {
    pub document_id: DbId,
    pub user_id: DbId,
    pub user_name: String,
    pub client_id: Uuid,
    /// Lock mode the session runs under. Optimistic sessions claim no lock.
    #[serde(default = "default_lock_type")]
    pub lock_type: LockType,
    /// Region for `LockType::Region` sessions; ignored otherwise.
    #[serde(default)]
    pub region: Option<LockRegion>,
}

fn default_lock_type() -> LockType {
    LockType::Optimistic
}

// ---------------------------------------------------------------------------
// DocumentLock
// ---------------------------------------------------------------------------

/// A row from the `document_locks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentLock {
    pub id: DbId,
    pub document_id: DbId,
    pub user_id: DbId,
    pub lock_type: String,
    pub region: Option<Json<LockRegion>>,
    pub acquired_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_active: bool,
    pub released_at: Option<Timestamp>,
    pub release_reason: Option<String>,
    pub created_at: Timestamp,
}

impl DocumentLock {
    /// The view of this row the lock-compatibility rule works on, or `None`
    /// if the stored lock type string is not recognised.
    pub fn as_held(&self) -> Option<HeldLock> {
        Some(HeldLock {
            id: self.id,
            user_id: self.user_id,
            lock_type: LockType::parse(&self.lock_type)?,
            region: self.region.as_ref().map(|json| json.0.clone()),
        })
    }
}

/// DTO for acquiring a document lock.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentLock {
    pub document_id: DbId,
    pub user_id: DbId,
    pub lock_type: LockType,
    #[serde(default)]
    pub region: Option<LockRegion>,
}

// ---------------------------------------------------------------------------
// EditOperation
// ---------------------------------------------------------------------------

/// A row from the append-only `edit_operations` table. Never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EditOperation {
    pub id: DbId,
    pub session_id: DbId,
    pub document_id: DbId,
    pub user_id: DbId,
    pub operation_type: String,
    pub position_line: i64,
    pub position_character: i64,
    pub content: String,
    pub sequence_number: i64,
    pub recorded_at: Timestamp,
}

impl EditOperation {
    /// The position this operation targets.
    pub fn position(&self) -> EditPosition {
        EditPosition {
            line: self.position_line,
            character: self.position_character,
        }
    }

    /// The slice of this row the conflict classifier looks at.
    pub fn footprint(&self) -> OperationFootprint {
        OperationFootprint {
            session_id: self.session_id,
            user_id: self.user_id,
            position: self.position(),
            recorded_at: self.recorded_at,
        }
    }
}

/// Insert payload for a new edit operation. The sequence number is assigned
/// separately from the per-document counter.
#[derive(Debug, Clone)]
pub struct CreateEditOperation {
    pub session_id: DbId,
    pub document_id: DbId,
    pub user_id: DbId,
    pub operation_type: OperationType,
    pub position: EditPosition,
    pub content: String,
}
