//! Typed errors surfaced by the collaboration engine.

use docket_core::types::DbId;

/// Engine-level error taxonomy.
///
/// Every variant carries a human-readable message embedding the offending
/// identifiers so calling surfaces can render actionable errors without
/// re-deriving the cause.
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    /// A referenced document, session, or lock does not exist.
    #[error("{entity} not found: id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// The caller lacks permission, or does not own the session/lock.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The requested lock is incompatible with an existing active lock.
    #[error("Lock conflict: {0}")]
    LockConflict(String),

    /// An operation was attempted against an ended session.
    #[error("Edit session {session_id} is not active")]
    SessionInactive { session_id: DbId },

    /// A request parameter failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The underlying store or an injected dependency failed.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CollabError {
    /// Wrap a persistence or dependency failure with operation context.
    pub fn store<E>(context: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CollabError::Store {
            context,
            source: source.into(),
        }
    }
}

/// Convenience type alias for engine operation return values.
pub type CollabResult<T> = Result<T, CollabError>;
