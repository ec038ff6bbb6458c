//! Arena-backed node tree.
//!
//! Detaching a node only unlinks it from its parent, so its [`NodeId`] stays
//! valid. [`Document::remove`] releases a node's slot instead; later
//! allocations reuse it and the old id must not be used again.

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tag name and attributes of an element node.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| key != name);
        before != self.attrs.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Lowercased `"{class} {id}"`, the string the content heuristics inspect.
    pub fn class_and_id(&self) -> String {
        format!(
            "{} {}",
            self.attr("class").unwrap_or(""),
            self.attr("id").unwrap_or("")
        )
        .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A mutable HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    /// Released slots, reused by `push`.
    free: Vec<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(node);
                id
            }
        }
    }

    /// Number of slots in the arena, released ones included.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of slots waiting to be reused.
    pub fn released_len(&self) -> usize {
        self.free.len()
    }

    // ─── Node data ───

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id) == Some(name)
    }

    /// Text of a text node; `None` for any other node kind.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Replaces the content of a text node. Returns `false` for other nodes.
    pub fn set_text(&mut self, id: NodeId, value: String) -> bool {
        match &mut self.node_mut(id).data {
            NodeData::Text(text) => {
                *text = value;
                true
            }
            _ => false,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        self.element_mut(id)
            .map(|e| e.remove_attr(name))
            .unwrap_or(false)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).map(|e| e.has_class(class)).unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            if element.has_class(class) {
                return;
            }
            let value = match element.attr("class") {
                Some(existing) if !existing.trim().is_empty() => {
                    format!("{} {}", existing.trim(), class)
                }
                _ => class.to_string(),
            };
            element.set_attr("class", &value);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(element) = self.element_mut(id) {
            if !element.has_class(class) {
                return;
            }
            let value = element
                .classes()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
            element.set_attr("class", &value);
        }
    }

    // ─── Navigation ───

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Parent node, if it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Element children only.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Strict descendants in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Descendant elements of `id` with the given tag name, in document order.
    pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .filter(|n| self.is_element_named(*n, tag))
            .collect()
    }

    /// First element in the document with the given tag name.
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|n| self.is_element_named(*n, tag))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element("body")
    }

    /// Text of the first `<title>`, whitespace-collapsed.
    pub fn title(&self) -> String {
        self.find_element("title")
            .map(|t| collapse_whitespace(&self.text_content(t)))
            .unwrap_or_default()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Number of characters in [`Document::text_content`], without allocating it.
    pub fn text_len(&self, id: NodeId) -> usize {
        if let Some(text) = self.text(id) {
            return text.chars().count();
        }
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .map(|t| t.chars().count())
            .sum()
    }

    /// Whether the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root() || self.ancestors(id).any(|a| a == self.root())
    }

    /// Position of the node in a pre-order walk from the root.
    pub fn document_position(&self, id: NodeId) -> Option<usize> {
        self.descendants(self.root()).position(|n| n == id)
    }

    // ─── Mutation ───

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.push(NodeData::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub(crate) fn create_node(&mut self, data: NodeData) -> NodeId {
        self.push(data)
    }

    /// Unlinks a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
    }

    /// Detaches `id` and releases it and its whole subtree for reuse.
    /// The root is never released.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node_mut(current);
            stack.append(&mut node.children);
            node.parent = None;
            node.data = NodeData::Comment(String::new());
            self.free.push(current);
        }
    }

    /// Appends `child` as the last child of `parent`, moving it if attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Inserts `child` right before `reference`, or appends when `reference`
    /// is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let position = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == reference);
        self.node_mut(child).parent = Some(parent);
        match position {
            Some(index) => self.node_mut(parent).children.insert(index, child),
            None => self.node_mut(parent).children.push(child),
        }
    }

    /// Inserts `child` right after `reference` under `parent`.
    pub fn insert_after(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let position = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == reference);
        self.node_mut(child).parent = Some(parent);
        match position {
            Some(index) => self.node_mut(parent).children.insert(index + 1, child),
            None => self.node_mut(parent).children.push(child),
        }
    }

    /// Copies the subtree rooted at `id` into a fresh document.
    ///
    /// Returns the new document and the id of the copied node inside it.
    pub fn clone_subtree(&self, id: NodeId) -> (Document, NodeId) {
        let mut copy = Document::new();
        let copied_root = copy.push(self.node(id).data.clone());
        let root = copy.root();
        copy.append_child(root, copied_root);

        let mut stack = vec![(id, copied_root)];
        while let Some((source, target)) = stack.pop() {
            for child in self.children(source) {
                let copied = copy.push(self.node(*child).data.clone());
                copy.append_child(target, copied);
                stack.push((*child, copied));
            }
        }
        (copy, copied_root)
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
