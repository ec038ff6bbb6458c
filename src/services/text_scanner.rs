//! Collects the text nodes a highlight pass may touch.

use crate::dom::{Document, NodeId, SelectorIndex};
use crate::types::highlight::{MARK_CLASS, MARK_TAG};

/// Containers whose text is never page content.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "object"];

/// Form controls; their text is user input, not page content.
const FORM_FIELD_TAGS: &[&str] = &["input", "textarea", "select"];

/// Returns accepted text nodes under `root` in document order, at most
/// `max_nodes` of them.
///
/// The result is a pure function of the tree and the arguments, so a pass can
/// rescan after mutating the document.
pub fn scan(
    doc: &Document,
    root: NodeId,
    include: &SelectorIndex,
    exclude: &SelectorIndex,
    max_nodes: usize,
) -> Vec<NodeId> {
    let mut accepted = Vec::new();
    if max_nodes == 0 {
        return accepted;
    }
    for node in doc.descendants(root) {
        if accepts(doc, node, include, exclude) {
            accepted.push(node);
            if accepted.len() >= max_nodes {
                break;
            }
        }
    }
    accepted
}

fn accepts(doc: &Document, node: NodeId, include: &SelectorIndex, exclude: &SelectorIndex) -> bool {
    let Some(text) = doc.text(node) else {
        return false;
    };
    if text.trim().is_empty() {
        return false;
    }
    let Some(parent) = doc.parent_element(node) else {
        return false;
    };
    if is_editable(doc, node) {
        return false;
    }
    for ancestor in doc.ancestors(node) {
        let Some(tag) = doc.tag_name(ancestor) else {
            continue;
        };
        if NON_CONTENT_TAGS.contains(&tag) {
            return false;
        }
        if tag == MARK_TAG && doc.has_class(ancestor, MARK_CLASS) {
            return false;
        }
    }
    if include.is_configured() && !include.matches_closest(doc, parent) {
        return false;
    }
    if exclude.is_configured() && exclude.matches_closest(doc, parent) {
        return false;
    }
    true
}

/// Inside a form field, or inside the nearest element that sets
/// `contenteditable` to anything but `"false"`.
fn is_editable(doc: &Document, node: NodeId) -> bool {
    for ancestor in doc.ancestors(node) {
        let Some(element) = doc.element(ancestor) else {
            continue;
        };
        if FORM_FIELD_TAGS.contains(&element.name.as_str()) {
            return true;
        }
        if let Some(value) = element.attr("contenteditable") {
            return !value.trim().eq_ignore_ascii_case("false");
        }
    }
    false
}
