//! Document regions for region-scoped locks (PRD-14).
//!
//! A region names a sub-range of a document along up to three dimensions:
//! a line range, a character range, and a named section. Dimensions are
//! independent; two regions overlap as soon as ANY dimension both of them
//! specify overlaps.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LockRegion
// ---------------------------------------------------------------------------

/// A sub-range of a document over which a region lock applies.
///
/// Serialized into the `document_locks.region` JSONB column. A range
/// dimension counts as specified only when both of its endpoints are set;
/// a half-specified range is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockRegion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_char: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_char: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl LockRegion {
    /// The line range, if both endpoints are set. Inclusive on both ends.
    pub fn line_range(&self) -> Option<(i64, i64)> {
        match (self.start_line, self.end_line) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// The character range, if both endpoints are set. Half-open: the end
    /// offset is exclusive.
    pub fn char_range(&self) -> Option<(i64, i64)> {
        match (self.start_char, self.end_char) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Whether the region specifies at least one complete dimension.
    pub fn has_any_dimension(&self) -> bool {
        self.line_range().is_some() || self.char_range().is_some() || self.section.is_some()
    }

    /// Whether this region overlaps another.
    ///
    /// Overlap holds as soon as any dimension both regions specify is
    /// overlapping: line ranges inclusively, character ranges half-open,
    /// sections by string equality. A region with no complete dimension
    /// overlaps nothing.
    pub fn overlaps(&self, other: &LockRegion) -> bool {
        if let (Some((a_start, a_end)), Some((b_start, b_end))) =
            (self.line_range(), other.line_range())
        {
            if a_start <= b_end && b_start <= a_end {
                return true;
            }
        }
        if let (Some((a_start, a_end)), Some((b_start, b_end))) =
            (self.char_range(), other.char_range())
        {
            if a_start < b_end && b_start < a_end {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (&self.section, &other.section) {
            if a == b {
                return true;
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a region supplied with a region-lock request.
///
/// Requires at least one complete dimension, ordered range endpoints, and
/// no half-specified ranges.
pub fn validate_region(region: &LockRegion) -> Result<(), String> {
    if region.start_line.is_some() != region.end_line.is_some() {
        return Err("Line range requires both start_line and end_line".to_string());
    }
    if region.start_char.is_some() != region.end_char.is_some() {
        return Err("Character range requires both start_char and end_char".to_string());
    }
    if let Some((start, end)) = region.line_range() {
        if start > end {
            return Err(format!("Line range is reversed: {start} > {end}"));
        }
    }
    if let Some((start, end)) = region.char_range() {
        if start > end {
            return Err(format!("Character range is reversed: {start} > {end}"));
        }
    }
    if !region.has_any_dimension() {
        return Err(
            "Region lock requires a line range, a character range, or a section".to_string(),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
