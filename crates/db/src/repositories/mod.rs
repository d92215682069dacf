//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod document_lock_repo;
pub mod document_repo;
pub mod edit_operation_repo;
pub mod edit_session_repo;

pub use audit_repo::AuditLogRepo;
pub use document_lock_repo::{DocumentLockRepo, LockAcquireOutcome};
pub use document_repo::DocumentRepo;
pub use edit_operation_repo::EditOperationRepo;
pub use edit_session_repo::EditSessionRepo;
