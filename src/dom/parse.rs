//! HTML parsing into the arena tree via `scraper`.

use scraper::{Html, Node};

use super::tree::{Document, ElementData, NodeData, NodeId};

impl Document {
    /// Parses a complete HTML document.
    ///
    /// Follows the HTML5 parsing rules: missing `<html>`, `<head>` and
    /// `<body>` elements are synthesised.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root = doc.root();
        import(&parsed, &mut doc, root);
        doc
    }

    /// Parses an HTML fragment. Its top-level nodes become the children of a
    /// synthetic `<div>` container, whose id is returned alongside the document.
    pub fn parse_fragment(html: &str) -> (Self, NodeId) {
        let parsed = Html::parse_fragment(html);
        let mut doc = Document::new();
        let root = doc.root();
        let container = doc.create_element(ElementData::new("div"));
        doc.append_child(root, container);
        import(&parsed, &mut doc, container);

        // scraper wraps fragment content in an <html> element
        let wrappers: Vec<NodeId> = doc
            .children(container)
            .iter()
            .copied()
            .filter(|c| doc.is_element_named(*c, "html"))
            .collect();
        for wrapper in wrappers {
            let moved: Vec<NodeId> = doc.children(wrapper).to_vec();
            for child in moved {
                doc.insert_before(container, child, wrapper);
            }
            doc.detach(wrapper);
        }
        (doc, container)
    }
}

/// Copies every node below the parsed root under `target`, preserving order.
fn import(parsed: &Html, doc: &mut Document, target: NodeId) {
    let mut stack = vec![(parsed.tree.root(), target)];
    while let Some((source, parent)) = stack.pop() {
        for child in source.children() {
            let data = match child.value() {
                Node::Element(element) => NodeData::Element(ElementData {
                    name: element.name().to_string(),
                    attrs: element
                        .attrs()
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect(),
                }),
                Node::Text(text) => NodeData::Text(text.to_string()),
                Node::Comment(comment) => NodeData::Comment(comment.to_string()),
                Node::Doctype(doctype) => NodeData::Doctype(doctype.name().to_string()),
                _ => continue,
            };
            let id = doc.create_node(data);
            doc.append_child(parent, id);
            stack.push((child, id));
        }
    }
}
