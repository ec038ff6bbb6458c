use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// Class carried by every marker element.
pub const MARK_CLASS: &str = "kh-mark";
/// Extra class carried by the marker under the navigation cursor.
pub const ACTIVE_CLASS: &str = "kh-active";
/// Attribute holding the owning group id (multi-color mode only).
pub const DATA_GROUP: &str = "data-kh-group";
/// Attribute holding the marker's position in the ordered list.
pub const DATA_INDEX: &str = "data-kh-index";
/// Tag used for marker elements.
pub const MARK_TAG: &str = "mark";
/// Implicit group shared by every match in single-color mode.
pub const DEFAULT_GROUP: &str = "default";

/// Palette used for multi-color mode when none is configured.
pub const DEFAULT_COLORS: [&str; 8] = [
    "rgba(59, 130, 246, 0.6)",
    "rgba(236, 72, 153, 0.6)",
    "rgba(34, 197, 94, 0.6)",
    "rgba(251, 191, 36, 0.6)",
    "rgba(168, 85, 247, 0.6)",
    "rgba(239, 68, 68, 0.6)",
    "rgba(20, 184, 166, 0.6)",
    "rgba(249, 115, 22, 0.6)",
];

/// All markers associated with one search term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighlightGroup {
    /// The term as typed; doubles as the group id.
    pub term: String,
    pub color: String,
    pub count: usize,
}

/// One marker element wrapping a single matched run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightMarker {
    pub node: NodeId,
    pub group: String,
    pub index: usize,
}

/// Mutable highlight bookkeeping for one page.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    /// Active groups in first-use order.
    pub groups: Vec<HighlightGroup>,
    /// Markers in document order; `markers[i].index == i`.
    pub markers: Vec<HighlightMarker>,
    /// Terms to persist for the page (trimmed, de-duplicated).
    pub saved_terms: Vec<String>,
}

impl HighlightState {
    pub fn group(&self, term: &str) -> Option<&HighlightGroup> {
        self.groups.iter().find(|g| g.term == term)
    }

    pub fn group_mut(&mut self, term: &str) -> Option<&mut HighlightGroup> {
        self.groups.iter_mut().find(|g| g.term == term)
    }

    /// Removes a group entry. Returns `true` if it existed.
    pub fn remove_group(&mut self, term: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.term != term);
        before != self.groups.len()
    }

    /// Adds `term` to the saved-terms list unless already present.
    pub fn remember_term(&mut self, term: &str) {
        let trimmed = term.trim();
        if !trimmed.is_empty() && !self.saved_terms.iter().any(|t| t == trimmed) {
            self.saved_terms.push(trimmed.to_string());
        }
    }

    pub fn forget_term(&mut self, term: &str) {
        self.saved_terms.retain(|t| t != term);
    }
}

/// Result of one `highlight_all` pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HighlightOutcome {
    pub count: usize,
    pub groups: Vec<HighlightGroup>,
}

/// Result of a clear operation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ClearOutcome {
    /// Number of marker elements unwrapped.
    pub removed: usize,
    /// Whether the requested group was known (always `true` for a full clear).
    pub found: bool,
}

/// Snapshot of the navigation cursor for the counter UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationInfo {
    /// `-1` when nothing is selected.
    pub current_index: i64,
    pub total: usize,
    pub has_highlights: bool,
    pub label: String,
}
