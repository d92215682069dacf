//! Pairwise edit-conflict classification (PRD-14).
//!
//! The engine never merges or rejects concurrent edits; it classifies pairs
//! of operations after the fact and surfaces the result to the caller.
//! Same-position edits are almost certainly destructive overwrites (high
//! severity). Edits on nearby lines may still compose cleanly and are
//! reported as informational (medium severity). Operations further apart
//! are assumed independent, which also bounds the cost of the pairwise
//! comparison.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Positions and operation kinds
// ---------------------------------------------------------------------------

/// A cursor position within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPosition {
    pub line: i64,
    pub character: i64,
}

/// The kind of an atomic edit operation.
///
/// Stored in the `edit_operations.operation_type` column as its lowercase
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Insert,
    Delete,
    Replace,
}

impl OperationType {
    /// The lowercase column value for this operation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Delete => "delete",
            OperationType::Replace => "replace",
        }
    }

    /// Parse a column value back into an operation type.
    pub fn parse(value: &str) -> Option<OperationType> {
        match value {
            "insert" => Some(OperationType::Insert),
            "delete" => Some(OperationType::Delete),
            "replace" => Some(OperationType::Replace),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Conflict classification
// ---------------------------------------------------------------------------

/// How two concurrent operations collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Both operations target the exact same position.
    ConcurrentEdit,
    /// The operations touch the same or adjacent lines.
    OverlappingRegions,
}

/// How urgently a detected conflict needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

/// Tunable bounds for the pairwise comparison.
///
/// The original heuristics ("nearby" lines, "recent" operations) carry no
/// exact justification, so both bounds are parameters rather than
/// hardcoded values.
#[derive(Debug, Clone, Copy)]
pub struct ConflictRules {
    /// Operations further apart in time than this never conflict.
    pub recency_window_secs: i64,
    /// Operations more than this many lines apart never conflict.
    pub line_distance: i64,
}

/// Default recency window for comparing operations (2 minutes).
pub const DEFAULT_CONFLICT_WINDOW_SECS: i64 = 120;

/// Default line-distance threshold for nearby-edit conflicts.
pub const DEFAULT_CONFLICT_LINE_DISTANCE: i64 = 1;

impl Default for ConflictRules {
    fn default() -> Self {
        Self {
            recency_window_secs: DEFAULT_CONFLICT_WINDOW_SECS,
            line_distance: DEFAULT_CONFLICT_LINE_DISTANCE,
        }
    }
}

/// The slice of an edit operation the classifier looks at.
#[derive(Debug, Clone)]
pub struct OperationFootprint {
    pub session_id: DbId,
    pub user_id: DbId,
    pub position: EditPosition,
    pub recorded_at: Timestamp,
}

/// A classified collision between two operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConflictFinding {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
}

/// Classify a pair of edit operations.
///
/// Returns `None` for operations from the same user or session, for pairs
/// recorded further apart than the recency window, and for pairs more than
/// `line_distance` lines apart. Symmetric in its two operands.
pub fn analyze_operation_conflict(
    a: &OperationFootprint,
    b: &OperationFootprint,
    rules: &ConflictRules,
) -> Option<ConflictFinding> {
    if a.user_id == b.user_id || a.session_id == b.session_id {
        return None;
    }
    let elapsed = (a.recorded_at - b.recorded_at).num_seconds().abs();
    if elapsed > rules.recency_window_secs {
        return None;
    }
    if a.position == b.position {
        return Some(ConflictFinding {
            conflict_type: ConflictType::ConcurrentEdit,
            severity: ConflictSeverity::High,
        });
    }
    if (a.position.line - b.position.line).abs() <= rules.line_distance {
        return Some(ConflictFinding {
            conflict_type: ConflictType::OverlappingRegions,
            severity: ConflictSeverity::Medium,
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
