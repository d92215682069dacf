//! Audit trail constants for the collaboration engine (PRD-27).
//!
//! The audit log itself is owned by the wider platform; this module only
//! fixes the entity/action vocabulary the engine emits so that API, engine,
//! and worker tooling agree on the strings.

/// Entity types the engine records audit entries against.
pub mod entity_types {
    pub const EDIT_SESSION: &str = "edit_session";
    pub const DOCUMENT_LOCK: &str = "document_lock";
}

/// Action types the engine records.
pub mod action_types {
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const ACQUIRE: &str = "acquire";
    pub const RELEASE: &str = "release";
}
