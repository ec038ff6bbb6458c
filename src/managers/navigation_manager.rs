//! Navigation Controller for pagemark.
//!
//! Implements `NavigationControllerTrait`: a single cursor over the ordered
//! marker list with wraparound next/previous, first/last jumps and the
//! counter label shown to the user.

use crate::dom::{Document, NodeId};
use crate::types::highlight::{HighlightMarker, NavigationInfo, ACTIVE_CLASS};

/// Label shown when the marker list is empty.
pub const NO_MATCHES_LABEL: &str = "No matches";

/// Trait defining navigation operations over a marker list.
///
/// Every operation returns `false` when the list is empty or the target is
/// out of range, leaving the cursor untouched.
pub trait NavigationControllerTrait {
    fn goto_index(
        &mut self,
        doc: &mut Document,
        markers: &[HighlightMarker],
        index: usize,
        scroll: bool,
    ) -> bool;
    fn next(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool;
    fn previous(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool;
    fn first(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool;
    fn last(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool;
    fn info(&self, total: usize) -> NavigationInfo;
}

/// Cursor state plus the last rendered counter.
#[derive(Debug, Clone)]
pub struct NavigationController {
    cursor: Option<usize>,
    counter: String,
    scroll_target: Option<NodeId>,
}

impl NavigationController {
    pub fn new() -> Self {
        Self {
            cursor: None,
            counter: NO_MATCHES_LABEL.to_string(),
            scroll_target: None,
        }
    }

    /// Current index, `None` when nothing is selected.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Counter text as of the last refresh.
    pub fn counter(&self) -> &str {
        &self.counter
    }

    /// Marker most recently requested to be scrolled into view.
    pub fn scroll_target(&self) -> Option<NodeId> {
        self.scroll_target
    }

    /// Drops the selection without touching the document.
    pub fn reset(&mut self, total: usize) {
        self.cursor = None;
        self.scroll_target = None;
        self.refresh(total);
    }

    /// Positions the cursor without toggling any marker. Used after a pass
    /// has rewritten the list; a following `goto_index` applies the flag.
    pub fn set_cursor(&mut self, cursor: Option<usize>, total: usize) {
        self.cursor = cursor.filter(|c| *c < total);
        self.refresh(total);
    }

    /// Keeps the cursor valid after the list shrank: out-of-range cursors
    /// move to the first marker, or to none when the list is empty.
    pub fn clamp(&mut self, total: usize) {
        if let Some(current) = self.cursor {
            if current >= total {
                self.cursor = if total > 0 { Some(0) } else { None };
            }
        }
        self.refresh(total);
    }

    /// Forgets the scroll target once its marker has left the list.
    pub fn drop_stale_scroll_target(&mut self, markers: &[HighlightMarker]) {
        if let Some(target) = self.scroll_target {
            if !markers.iter().any(|m| m.node == target) {
                self.scroll_target = None;
            }
        }
    }

    /// Recomputes the counter label.
    pub fn refresh(&mut self, total: usize) {
        self.counter = Self::label(self.cursor, total);
    }

    fn label(cursor: Option<usize>, total: usize) -> String {
        if total == 0 {
            return NO_MATCHES_LABEL.to_string();
        }
        // an unselected cursor reads as 0, like the counter it mirrors
        let position = cursor.map(|c| c + 1).unwrap_or(0);
        format!("{} of {}", position, total)
    }
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationControllerTrait for NavigationController {
    fn goto_index(
        &mut self,
        doc: &mut Document,
        markers: &[HighlightMarker],
        index: usize,
        scroll: bool,
    ) -> bool {
        let Some(target) = markers.get(index) else {
            return false;
        };
        if let Some(previous) = self.cursor.and_then(|c| markers.get(c)) {
            doc.remove_class(previous.node, ACTIVE_CLASS);
        }
        self.cursor = Some(index);
        doc.add_class(target.node, ACTIVE_CLASS);
        if scroll {
            self.scroll_target = Some(target.node);
        }
        self.refresh(markers.len());
        true
    }

    fn next(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool {
        if markers.is_empty() {
            return false;
        }
        let index = match self.cursor {
            Some(c) if c + 1 < markers.len() => c + 1,
            _ => 0,
        };
        self.goto_index(doc, markers, index, true)
    }

    fn previous(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool {
        if markers.is_empty() {
            return false;
        }
        let index = match self.cursor {
            Some(c) if c > 0 && c < markers.len() => c - 1,
            _ => markers.len() - 1,
        };
        self.goto_index(doc, markers, index, true)
    }

    fn first(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool {
        self.goto_index(doc, markers, 0, true)
    }

    fn last(&mut self, doc: &mut Document, markers: &[HighlightMarker]) -> bool {
        match markers.len().checked_sub(1) {
            Some(index) => self.goto_index(doc, markers, index, true),
            None => false,
        }
    }

    fn info(&self, total: usize) -> NavigationInfo {
        NavigationInfo {
            current_index: self.cursor.map(|c| c as i64).unwrap_or(-1),
            total,
            has_highlights: total > 0,
            label: Self::label(self.cursor, total),
        }
    }
}
