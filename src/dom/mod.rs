//! In-memory DOM used by the capture and anchoring pipelines
//!
//! The tree is an arena of nodes addressed by [`NodeId`]. Removed nodes stay
//! in the arena (detached) so that stale handles held by marks or ranges can
//! still be inspected and reported as disconnected.
//!
//! Every mutation is appended to a journal of [`MutationRecord`]s. The
//! journal is drained by the document session, which turns it into
//! mutation events for subscribers.

mod parse;
mod range;
mod serialize;
mod walk;

pub use range::{compare_points, Boundary, LeafSlice, Range, Selection};
pub use walk::TreeWalker;

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Closed set of node kinds the engine distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a lowercase tag name and attributes
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
    /// Document root, processing instructions and anything else
    Other,
}

/// Element name and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase local name
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set (or replace) an attribute value
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }
}

/// A single journal entry describing a tree change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationRecord {
    /// `child` was inserted under `parent`
    ChildAdded { parent: NodeId, child: NodeId },
    /// `child` was detached from `parent`
    ChildRemoved { parent: NodeId, child: NodeId },
    /// Character data of a text node changed
    TextChanged(NodeId),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    journal: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Other,
                parent: None,
                children: Vec::new(),
            }],
            journal: Vec::new(),
        }
    }

    /// The document root
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The `<body>` element, or the root when the document has none
    pub fn body(&self) -> NodeId {
        TreeWalker::new(self, self.root())
            .find(|&id| self.tag_name(id) == Some("body"))
            .unwrap_or_else(|| self.root())
    }

    /// Number of nodes in the arena, including detached ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.data(id).kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Character data of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Text(_))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.last().copied()
    }

    /// Position of a node among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// Node length in boundary-point terms: chars for text, children otherwise
    pub fn node_len(&self, id: NodeId) -> usize {
        match &self.data(id).kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => text.chars().count(),
            _ => self.children(id).len(),
        }
    }

    /// Ancestors from the node's parent up to the topmost ancestor
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// Whether the node is still attached below the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root() || self.ancestors(id).any(|node| node == self.root())
    }

    /// Inclusive containment check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Deepest node containing both `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|&candidate| self.contains(candidate, b))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        TreeWalker::new(self, id)
            .filter_map(|node| self.text(node))
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(name);
        for (key, value) in attrs {
            data.set_attr(key, value);
        }
        self.push_node(NodeKind::Element(data))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Comment(text.to_string()))
    }

    /// Detach a node from its parent. Detaching a detached node is a no-op.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.data_mut(parent).children.retain(|&child| child != id);
        self.data_mut(id).parent = None;
        self.journal.push(MutationRecord::ChildRemoved { parent, child: id });
    }

    /// Insert `child` under `parent` before `reference` (append when `None`)
    ///
    /// The child is detached from its current parent first. Inserting a node
    /// into its own subtree is refused and leaves the tree unchanged.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.contains(child, parent) {
            return;
        }
        self.remove(child);
        let position = reference
            .filter(|&r| self.parent(r) == Some(parent))
            .and_then(|r| self.index_in_parent(r))
            .unwrap_or(self.children(parent).len());
        self.data_mut(parent).children.insert(position, child);
        self.data_mut(child).parent = Some(parent);
        self.journal.push(MutationRecord::ChildAdded { parent, child });
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Replace a text node's character data
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(existing) = &mut self.data_mut(id).kind {
            *existing = text.to_string();
            self.journal.push(MutationRecord::TextChanged(id));
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.data_mut(id).kind {
            el.set_attr(name, value);
        }
    }

    /// Split a text node at a char offset
    ///
    /// The original node keeps `[0, offset)`; a new sibling holding the rest is
    /// inserted right after it and returned. Returns `None` for non-text nodes.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?.to_string();
        let byte_offset = text
            .char_indices()
            .nth(offset)
            .map(|(index, _)| index)
            .unwrap_or(text.len());
        let (head, tail) = text.split_at(byte_offset);
        let tail_node = self.create_text(tail);
        self.set_text(id, head);
        if let Some(parent) = self.parent(id) {
            let reference = self.next_sibling(id);
            self.insert_before(parent, tail_node, reference);
        }
        Some(tail_node)
    }

    /// Merge adjacent text children and drop empty ones
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                previous_text = None;
                continue;
            };
            if text.is_empty() {
                self.remove(child);
                continue;
            }
            match previous_text {
                Some(previous) => {
                    let merged = format!("{}{}", self.text(previous).unwrap_or_default(), text);
                    self.set_text(previous, &merged);
                    self.remove(child);
                }
                None => previous_text = Some(child),
            }
        }
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    /// Number of records currently queued
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Take all queued mutation records
    pub fn drain_journal(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    /// Drop records queued after `len`
    pub fn truncate_journal(&mut self, len: usize) {
        self.journal.truncate(len);
    }
}
