//! Graph diff reporting for committed edits

use crate::model::*;
use serde::{Deserialize, Serialize};

/// What a commit changed in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDiff {
    /// Monotonically increasing diff sequence number.
    pub sequence: u64,
    /// Files whose text was edited.
    pub touched_files: Vec<FileId>,
    /// Symbols created by re-extraction.
    pub added_symbols: Vec<NodeId>,
    /// Symbols dropped because an edit intersected them.
    pub removed_symbols: Vec<NodeId>,
    /// Symbols kept across the edit, possibly at shifted offsets.
    pub shifted_symbols: Vec<NodeId>,
    /// Files whose usages and imports were resolved again.
    pub reresolved_files: Vec<FileId>,
    /// Usages left unresolved after the commit.
    pub unresolved_usages: Vec<UsageId>,
}

impl GraphDiff {
    /// Create an empty diff with given sequence number.
    pub fn new(sequence: u64) -> Self {
        GraphDiff {
            sequence,
            ..Default::default()
        }
    }

    /// Check if this diff is empty (no structural changes).
    pub fn is_empty(&self) -> bool {
        self.touched_files.is_empty()
            && self.added_symbols.is_empty()
            && self.removed_symbols.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Hands out diff sequence numbers.
#[derive(Debug)]
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Start the next diff.
    pub fn next_diff(&mut self) -> GraphDiff {
        self.sequence += 1;
        GraphDiff::new(self.sequence)
    }

    /// Get current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}
