//! Merge diff model

use serde::{Deserialize, Serialize};

use super::Pin;

/// Audit record of a merge between two differing pins
///
/// Diagnostic only: the canonical store never reads state back from diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDiff {
    /// The two operands, in the order they were merged
    pub before: [Pin; 2],
    /// The merge result
    pub after: Pin,
}

impl MergeDiff {
    #[must_use]
    pub fn new(x: Pin, y: Pin, after: Pin) -> Self {
        Self {
            before: [x, y],
            after,
        }
    }
}

/// A merge diff as recorded by the canonical store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMergeDiff {
    /// Audit row identifier
    pub id: i64,
    /// Identity of the merged pin
    pub pin_id: String,
    /// When the merge was committed (unix ms)
    pub recorded_at: i64,
    pub diff: MergeDiff,
}
