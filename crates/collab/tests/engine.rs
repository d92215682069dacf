//! End-to-end tests for the collaboration engine (PRD-14).
//!
//! Drives the public engine surface against a real database: session
//! lifecycle and permission gating, lock arbitration, operation recording
//! with conflict classification, state aggregation, and the cleanup sweep.

use std::sync::Arc;

use assert_matches::assert_matches;
use sqlx::PgPool;
use uuid::Uuid;

use docket_collab::{
    ApplyEditOperation, AuditSink, CleanupSweep, CollabConfig, CollabError, DbAuditSink,
    DbDocumentDirectory, LockManager, OperationLog, SessionManager, StateAggregator,
};
use docket_core::collaboration::LockType;
use docket_core::conflict::{ConflictSeverity, ConflictType, EditPosition, OperationType};
use docket_core::region::LockRegion;
use docket_db::models::collaboration::CreateEditSession;
use docket_db::repositories::{AuditLogRepo, DocumentLockRepo, EditSessionRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (email, display_name) VALUES ($1, $1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_document(pool: &PgPool, owner_id: i64, title: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO documents (title, owner_id) VALUES ($1, $2) RETURNING id")
        .bind(title)
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn grant_edit(pool: &PgPool, document_id: i64, user_id: i64) {
    sqlx::query(
        "INSERT INTO document_permissions (document_id, user_id, can_edit) VALUES ($1, $2, true)",
    )
    .bind(document_id)
    .bind(user_id)
    .execute(pool)
    .await
    .unwrap();
}

fn manager(pool: &PgPool) -> SessionManager {
    SessionManager::new(
        pool.clone(),
        Arc::new(DbDocumentDirectory::new(pool.clone())),
        Arc::new(DbAuditSink::new(pool.clone())),
        CollabConfig::default(),
    )
}

fn start_input(document_id: i64, user_id: i64, lock_type: LockType) -> CreateEditSession {
    CreateEditSession {
        document_id,
        user_id,
        user_name: "Ada Reyes".to_string(),
        client_id: Uuid::new_v4(),
        lock_type,
        region: None,
    }
}

fn edit(operation_type: OperationType, line: i64, character: i64) -> ApplyEditOperation {
    ApplyEditOperation {
        operation_type,
        position: EditPosition { line, character },
        content: "hereinafter".to_string(),
    }
}

fn lines(start: i64, end: i64) -> LockRegion {
    LockRegion {
        start_line: Some(start),
        end_line: Some(end),
        ..LockRegion::default()
    }
}

/// Sink that always fails, for exercising the best-effort audit path.
struct FailingAuditSink;

#[async_trait::async_trait]
impl AuditSink for FailingAuditSink {
    async fn record_audit(
        &self,
        _entity_type: &str,
        _entity_id: i64,
        _action: &str,
        _details: serde_json::Value,
        _user_id: i64,
    ) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("audit store offline"))
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn optimistic_session_start_claims_no_lock_and_records_audit(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let doc = seed_document(&pool, owner, "Master Services Agreement").await;
    let sessions = manager(&pool);

    let session = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();
    assert!(session.is_active);
    assert_eq!(session.lock_type, "optimistic");

    let locks = sessions.locks().active_locks(doc).await.unwrap();
    assert!(locks.is_empty());

    let audit = AuditLogRepo::list_for_entity(&pool, "edit_session", session.id)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action_type, "start");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn start_fails_for_unknown_document(pool: PgPool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let sessions = manager(&pool);

    let err = sessions
        .start_edit_session(start_input(9999, user, LockType::Optimistic))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::NotFound { entity: "document", id: 9999 });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn start_fails_without_edit_permission(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let stranger = seed_user(&pool, "stranger@example.com").await;
    let doc = seed_document(&pool, owner, "NDA").await;
    let sessions = manager(&pool);

    let err = sessions
        .start_edit_session(start_input(doc, stranger, LockType::Optimistic))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::AccessDenied(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn grantee_may_start_a_session(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let grantee = seed_user(&pool, "grantee@example.com").await;
    let doc = seed_document(&pool, owner, "NDA").await;
    grant_edit(&pool, doc, grantee).await;
    let sessions = manager(&pool);

    let session = sessions
        .start_edit_session(start_input(doc, grantee, LockType::Optimistic))
        .await
        .unwrap();
    assert_eq!(session.user_id, grantee);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_owner_may_end_a_session_and_only_once(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let rival = seed_user(&pool, "rival@example.com").await;
    let doc = seed_document(&pool, owner, "NDA").await;
    let sessions = manager(&pool);

    let session = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();

    let err = sessions.end_edit_session(session.id, rival).await.unwrap_err();
    assert_matches!(err, CollabError::AccessDenied(_));

    let ended = sessions.end_edit_session(session.id, owner).await.unwrap();
    assert!(!ended.is_active);
    assert_eq!(ended.end_reason.as_deref(), Some("manual"));

    let err = sessions.end_edit_session(session.id, owner).await.unwrap_err();
    assert_matches!(err, CollabError::SessionInactive { .. });

    let err = sessions.end_edit_session(9999, owner).await.unwrap_err();
    assert_matches!(err, CollabError::NotFound { entity: "edit session", .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn heartbeat_refreshes_an_idle_session(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let rival = seed_user(&pool, "rival@example.com").await;
    let doc = seed_document(&pool, owner, "NDA").await;
    let sessions = manager(&pool);

    let session = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();

    sqlx::query(
        "UPDATE edit_sessions SET last_activity_at = NOW() - INTERVAL '10 minutes' WHERE id = $1",
    )
    .bind(session.id)
    .execute(&pool)
    .await
    .unwrap();
    let stale = EditSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();

    let err = sessions.heartbeat(session.id, rival).await.unwrap_err();
    assert_matches!(err, CollabError::AccessDenied(_));

    sessions.heartbeat(session.id, owner).await.unwrap();
    let refreshed = EditSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert!(refreshed.last_activity_at > stale.last_activity_at);

    sessions.end_edit_session(session.id, owner).await.unwrap();
    let err = sessions.heartbeat(session.id, owner).await.unwrap_err();
    assert_matches!(err, CollabError::SessionInactive { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn audit_failure_does_not_fail_session_start(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let doc = seed_document(&pool, owner, "NDA").await;
    let sessions = SessionManager::new(
        pool.clone(),
        Arc::new(DbDocumentDirectory::new(pool.clone())),
        Arc::new(FailingAuditSink),
        CollabConfig::default(),
    );

    let session = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();
    assert!(session.is_active);
}

// ---------------------------------------------------------------------------
// Lock arbitration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn exclusive_session_blocks_rivals_without_creating_their_session(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "SOW").await;
    grant_edit(&pool, doc, bob).await;
    let sessions = manager(&pool);

    sessions
        .start_edit_session(start_input(doc, alice, LockType::Exclusive))
        .await
        .unwrap();
    let locks = sessions.locks().active_locks(doc).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].lock_type, "exclusive");

    // A refused lock aborts the session start entirely.
    let err = sessions
        .start_edit_session(start_input(doc, bob, LockType::Shared))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::LockConflict(reason) => {
        assert!(reason.contains("exclusive lock"));
    });

    // Identity does not matter: even the holder cannot stack an exclusive.
    let err = sessions
        .start_edit_session(start_input(doc, alice, LockType::Exclusive))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::LockConflict(_));

    let state = StateAggregator::new(pool.clone(), CollabConfig::default())
        .get_collaboration_state(doc)
        .await
        .unwrap();
    assert_eq!(state.active_sessions.len(), 1);
    assert_eq!(state.active_sessions[0].user_id, alice);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn shared_request_succeeds_once_the_exclusive_is_released(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "SOW").await;
    let locks = LockManager::new(pool.clone(), CollabConfig::default());

    let exclusive = locks
        .acquire_document_lock(doc, alice, LockType::Exclusive, None)
        .await
        .unwrap();

    let err = locks
        .acquire_document_lock(doc, bob, LockType::Shared, None)
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::LockConflict(_));

    // Only the holder may release.
    let err = locks.release_document_lock(exclusive.id, bob).await.unwrap_err();
    assert_matches!(err, CollabError::AccessDenied(_));

    locks.release_document_lock(exclusive.id, alice).await.unwrap();

    let shared = locks
        .acquire_document_lock(doc, bob, LockType::Shared, None)
        .await
        .unwrap();
    assert_eq!(shared.lock_type, "shared");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn region_locks_conflict_only_when_regions_overlap(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "Contract").await;
    let locks = LockManager::new(pool.clone(), CollabConfig::default());

    locks
        .acquire_document_lock(doc, alice, LockType::Region, Some(lines(15, 25)))
        .await
        .unwrap();

    let err = locks
        .acquire_document_lock(doc, bob, LockType::Region, Some(lines(10, 20)))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::LockConflict(reason) => {
        assert!(reason.contains("overlaps"));
    });

    locks
        .acquire_document_lock(doc, bob, LockType::Region, Some(lines(30, 40)))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn region_requests_must_carry_a_usable_region(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let doc = seed_document(&pool, alice, "Contract").await;
    let locks = LockManager::new(pool.clone(), CollabConfig::default());

    let err = locks
        .acquire_document_lock(doc, alice, LockType::Region, None)
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::Validation(_));

    let err = locks
        .acquire_document_lock(doc, alice, LockType::Region, Some(LockRegion::default()))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_holder_may_extend_a_lease(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "Contract").await;
    let locks = LockManager::new(pool.clone(), CollabConfig::default());

    let lock = locks
        .acquire_document_lock(doc, alice, LockType::Shared, None)
        .await
        .unwrap();

    let err = locks.extend_document_lock(lock.id, bob).await.unwrap_err();
    assert_matches!(err, CollabError::AccessDenied(_));

    let extended = locks.extend_document_lock(lock.id, alice).await.unwrap();
    assert!(extended.expires_at >= lock.expires_at);
}

// ---------------------------------------------------------------------------
// Operations and conflict detection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_edits_are_classified_not_blocked(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "Contract").await;
    grant_edit(&pool, doc, bob).await;
    let sessions = manager(&pool);
    let operations = OperationLog::new(pool.clone(), CollabConfig::default());

    let s1 = sessions
        .start_edit_session(start_input(doc, alice, LockType::Optimistic))
        .await
        .unwrap();
    let s2 = sessions
        .start_edit_session(start_input(doc, bob, LockType::Optimistic))
        .await
        .unwrap();

    let first = operations
        .apply_edit_operation(s1.id, edit(OperationType::Insert, 10, 5))
        .await
        .unwrap();
    assert_eq!(first.operation.sequence_number, 1);
    assert!(first.conflicts.is_empty());

    // Same position, other user: destructive overwrite, high severity.
    let second = operations
        .apply_edit_operation(s2.id, edit(OperationType::Delete, 10, 5))
        .await
        .unwrap();
    assert_eq!(second.operation.sequence_number, 2);
    assert_eq!(second.conflicts.len(), 1);
    assert_eq!(second.conflicts[0].conflict_type, ConflictType::ConcurrentEdit);
    assert_eq!(second.conflicts[0].severity, ConflictSeverity::High);
    assert_eq!(second.conflicts[0].conflicting_operation.id, first.operation.id);

    // Far away on the document: assumed independent.
    let third = operations
        .apply_edit_operation(s2.id, edit(OperationType::Replace, 50, 20))
        .await
        .unwrap();
    assert_eq!(third.operation.sequence_number, 3);
    assert!(third.conflicts.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn nearby_line_edits_are_flagged_as_medium(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "Contract").await;
    grant_edit(&pool, doc, bob).await;
    let sessions = manager(&pool);
    let operations = OperationLog::new(pool.clone(), CollabConfig::default());

    let s1 = sessions
        .start_edit_session(start_input(doc, alice, LockType::Optimistic))
        .await
        .unwrap();
    let s2 = sessions
        .start_edit_session(start_input(doc, bob, LockType::Optimistic))
        .await
        .unwrap();

    operations
        .apply_edit_operation(s1.id, edit(OperationType::Insert, 10, 5))
        .await
        .unwrap();
    let nearby = operations
        .apply_edit_operation(s2.id, edit(OperationType::Insert, 11, 40))
        .await
        .unwrap();
    assert_eq!(nearby.conflicts.len(), 1);
    assert_eq!(
        nearby.conflicts[0].conflict_type,
        ConflictType::OverlappingRegions
    );
    assert_eq!(nearby.conflicts[0].severity, ConflictSeverity::Medium);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn operations_require_an_active_session(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let doc = seed_document(&pool, owner, "Contract").await;
    let sessions = manager(&pool);
    let operations = OperationLog::new(pool.clone(), CollabConfig::default());

    let err = operations
        .apply_edit_operation(9999, edit(OperationType::Insert, 1, 1))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::NotFound { entity: "edit session", .. });

    let session = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();
    sessions.end_edit_session(session.id, owner).await.unwrap();

    let err = operations
        .apply_edit_operation(session.id, edit(OperationType::Insert, 1, 1))
        .await
        .unwrap_err();
    assert_matches!(err, CollabError::SessionInactive { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn applying_an_operation_refreshes_the_session(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let doc = seed_document(&pool, owner, "Contract").await;
    let sessions = manager(&pool);
    let operations = OperationLog::new(pool.clone(), CollabConfig::default());

    let session = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();
    sqlx::query(
        "UPDATE edit_sessions SET last_activity_at = NOW() - INTERVAL '10 minutes' WHERE id = $1",
    )
    .bind(session.id)
    .execute(&pool)
    .await
    .unwrap();
    let stale = EditSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();

    operations
        .apply_edit_operation(session.id, edit(OperationType::Insert, 1, 1))
        .await
        .unwrap();

    let refreshed = EditSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert!(refreshed.last_activity_at > stale.last_activity_at);
}

// ---------------------------------------------------------------------------
// Collaboration state
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn state_snapshot_reports_sessions_locks_operations_and_conflicts(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;
    let doc = seed_document(&pool, alice, "Contract").await;
    grant_edit(&pool, doc, bob).await;
    let sessions = manager(&pool);
    let operations = OperationLog::new(pool.clone(), CollabConfig::default());

    let s1 = sessions
        .start_edit_session(start_input(doc, alice, LockType::Optimistic))
        .await
        .unwrap();
    let s2 = sessions
        .start_edit_session(start_input(doc, bob, LockType::Shared))
        .await
        .unwrap();
    operations
        .apply_edit_operation(s1.id, edit(OperationType::Insert, 10, 5))
        .await
        .unwrap();
    operations
        .apply_edit_operation(s2.id, edit(OperationType::Delete, 10, 5))
        .await
        .unwrap();

    let state = StateAggregator::new(pool.clone(), CollabConfig::default())
        .get_collaboration_state(doc)
        .await
        .unwrap();
    assert_eq!(state.document_id, doc);
    assert_eq!(state.active_sessions.len(), 2);
    assert_eq!(state.active_locks.len(), 1);
    assert_eq!(state.recent_operations.len(), 2);
    assert_eq!(state.conflict_count, 1);
}

// ---------------------------------------------------------------------------
// Cleanup sweep
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_reclaims_idle_sessions_and_expired_locks(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let doc = seed_document(&pool, owner, "Contract").await;
    let sessions = manager(&pool);

    let idle = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();
    let fresh = sessions
        .start_edit_session(start_input(doc, owner, LockType::Optimistic))
        .await
        .unwrap();
    let lock = sessions
        .locks()
        .acquire_document_lock(doc, owner, LockType::Shared, None)
        .await
        .unwrap();

    sqlx::query(
        "UPDATE edit_sessions SET last_activity_at = NOW() - INTERVAL '40 minutes' WHERE id = $1",
    )
    .bind(idle.id)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "UPDATE document_locks SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1",
    )
    .bind(lock.id)
    .execute(&pool)
    .await
    .unwrap();

    let outcome = CleanupSweep::new(pool.clone(), CollabConfig::default())
        .cleanup_expired_sessions()
        .await;
    assert_eq!(outcome.sessions_timed_out, 1);
    assert_eq!(outcome.locks_expired, 1);

    let idle = EditSessionRepo::find_by_id(&pool, idle.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!idle.is_active);
    assert_eq!(idle.end_reason.as_deref(), Some("timeout"));

    let fresh = EditSessionRepo::find_by_id(&pool, fresh.id)
        .await
        .unwrap()
        .unwrap();
    assert!(fresh.is_active);

    let lock = DocumentLockRepo::find_by_id(&pool, lock.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!lock.is_active);
    assert_eq!(lock.release_reason.as_deref(), Some("expired"));

    // Post-sweep invariants: nothing active is stale or expired.
    let stale_sessions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM edit_sessions \
         WHERE is_active = true AND last_activity_at < NOW() - INTERVAL '30 minutes'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stale_sessions, 0);
    let expired_locks: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM document_locks WHERE is_active = true AND expires_at < NOW()",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(expired_locks, 0);
}
