//! Text-node splitting and wrapper insertion.
//!
//! All offsets are byte offsets into the text node's content and must fall on
//! char boundaries. Every operation preserves the concatenated text of the
//! affected parent exactly.

use super::tree::{Document, ElementData, NodeData, NodeId};

/// Nodes produced by [`TextTreeEditor::wrap_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedRange {
    /// The new wrapper element.
    pub wrapper: NodeId,
    /// The text node now inside the wrapper.
    pub inner: NodeId,
    /// Text node holding whatever followed the range, if anything did.
    pub after: Option<NodeId>,
}

pub trait TextTreeEditor {
    /// Splits a text node at `offset`. The node keeps `[..offset]`; the
    /// returned sibling, inserted right after it, holds `[offset..]`.
    fn split_at(&mut self, text: NodeId, offset: usize) -> Option<NodeId>;

    /// Moves `[start..end)` of a text node into a new `wrapper` element placed
    /// where the range was.
    fn wrap_range(
        &mut self,
        text: NodeId,
        start: usize,
        end: usize,
        wrapper: ElementData,
    ) -> Option<WrappedRange>;

    /// Replaces `wrapper` by its children and releases it. Returns the
    /// former parent.
    fn unwrap(&mut self, wrapper: NodeId) -> Option<NodeId>;

    /// Merges adjacent text nodes and drops empty ones below `node`,
    /// releasing the dropped nodes.
    fn normalize(&mut self, node: NodeId);
}

impl TextTreeEditor for Document {
    fn split_at(&mut self, text: NodeId, offset: usize) -> Option<NodeId> {
        let parent = self.parent(text)?;
        let content = self.text(text)?;
        if offset > content.len() || !content.is_char_boundary(offset) {
            return None;
        }
        let tail = content[offset..].to_string();
        let head = content[..offset].to_string();
        self.set_text(text, head);
        let sibling = self.create_text(tail);
        self.insert_after(parent, sibling, text);
        Some(sibling)
    }

    fn wrap_range(
        &mut self,
        text: NodeId,
        start: usize,
        end: usize,
        wrapper: ElementData,
    ) -> Option<WrappedRange> {
        let parent = self.parent(text)?;
        let len = self.text(text)?.len();
        if start >= end || end > len {
            return None;
        }
        {
            let content = self.text(text)?;
            if !content.is_char_boundary(start) || !content.is_char_boundary(end) {
                return None;
            }
        }

        let inner = if start > 0 {
            self.split_at(text, start)?
        } else {
            text
        };
        let after = if end < len {
            Some(self.split_at(inner, end - start)?)
        } else {
            None
        };

        let wrapper = self.create_element(wrapper);
        self.insert_before(parent, wrapper, inner);
        self.append_child(wrapper, inner);
        Some(WrappedRange {
            wrapper,
            inner,
            after,
        })
    }

    fn unwrap(&mut self, wrapper: NodeId) -> Option<NodeId> {
        let parent = self.parent(wrapper)?;
        let children: Vec<NodeId> = self.children(wrapper).to_vec();
        for child in children {
            self.insert_before(parent, child, wrapper);
        }
        self.remove(wrapper);
        Some(parent)
    }

    fn normalize(&mut self, node: NodeId) {
        let mut containers = vec![node];
        containers.extend(
            self.descendants(node)
                .filter(|n| !matches!(self.data(*n), NodeData::Text(_))),
        );

        for container in containers {
            let children: Vec<NodeId> = self.children(container).to_vec();
            let mut run_head: Option<NodeId> = None;
            for child in children {
                let Some(content) = self.text(child).map(str::to_string) else {
                    run_head = None;
                    continue;
                };
                if content.is_empty() {
                    self.remove(child);
                    continue;
                }
                match run_head {
                    Some(head) => {
                        let mut merged = self.text(head).unwrap_or_default().to_string();
                        merged.push_str(&content);
                        self.set_text(head, merged);
                        self.remove(child);
                    }
                    None => run_head = Some(child),
                }
            }
        }
    }
}
