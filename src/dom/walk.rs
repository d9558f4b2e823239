//! Document-order traversal and ordering
//!
//! Traversal is bounded by a root: the walker never leaves the subtree it
//! was created for. Ordering follows the DOM convention where an ancestor
//! precedes all of its descendants.

use std::cmp::Ordering;

use super::{Document, NodeId};

/// Pre-order walker over a subtree, root included
#[derive(Debug, Clone)]
pub struct TreeWalker<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(doc: &'a Document, root: NodeId) -> Self {
        Self {
            doc,
            root,
            next: Some(root),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node following `node` in document order, descending into children
    pub fn following(&self, node: NodeId) -> Option<NodeId> {
        self.doc
            .first_child(node)
            .or_else(|| self.following_skipping_children(node))
    }

    /// Node following `node` without entering its subtree
    ///
    /// Moves to the next sibling, or climbs until an ancestor (below the
    /// root) has one.
    pub fn following_skipping_children(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            if current == self.root {
                return None;
            }
            if let Some(sibling) = self.doc.next_sibling(current) {
                return Some(sibling);
            }
            current = self.doc.parent(current)?;
        }
    }

    /// Skip the subtree of the node most recently yielded
    ///
    /// `last` must be the node returned by the previous call to `next`.
    pub fn skip_children(&mut self, last: NodeId) {
        self.next = self.following_skipping_children(last);
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.following(current);
        Some(current)
    }
}

impl Document {
    /// Compare two nodes in document order
    ///
    /// Ancestors come before their descendants. Nodes in different trees
    /// (one of them detached) compare by arena index as a stable fallback.
    pub fn compare_position(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        let path_a = self.path_from_top(a);
        let path_b = self.path_from_top(b);

        if path_a.first() != path_b.first() {
            return a.index().cmp(&b.index());
        }

        for (step_a, step_b) in path_a.iter().zip(path_b.iter()) {
            if step_a == step_b {
                continue;
            }
            // Diverging siblings under a shared parent
            let ia = self.index_in_parent(*step_a).unwrap_or(0);
            let ib = self.index_in_parent(*step_b).unwrap_or(0);
            return ia.cmp(&ib);
        }

        // One path is a prefix of the other: the shorter one is the ancestor
        path_a.len().cmp(&path_b.len())
    }

    /// Chain of nodes from the topmost ancestor down to `node`
    fn path_from_top(&self, node: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = std::iter::once(node).chain(self.ancestors(node)).collect();
        path.reverse();
        path
    }

    /// Whether `a` precedes `b` in document order
    pub fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        self.compare_position(a, b) == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Document, Vec<NodeId>) {
        // root > div > [p > "a", p > "b"], span
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element("div", &[]);
        let p1 = doc.create_element("p", &[]);
        let a = doc.create_text("a");
        let p2 = doc.create_element("p", &[]);
        let b = doc.create_text("b");
        let span = doc.create_element("span", &[]);
        doc.append_child(root, div);
        doc.append_child(div, p1);
        doc.append_child(p1, a);
        doc.append_child(div, p2);
        doc.append_child(p2, b);
        doc.append_child(root, span);
        (doc, vec![root, div, p1, a, p2, b, span])
    }

    #[test]
    fn test_walk_document_order() {
        let (doc, nodes) = tree();
        let walked: Vec<NodeId> = TreeWalker::new(&doc, doc.root()).collect();
        assert_eq!(walked, nodes);
    }

    #[test]
    fn test_walk_is_bounded_by_root() {
        let (doc, nodes) = tree();
        let div = nodes[1];
        let walked: Vec<NodeId> = TreeWalker::new(&doc, div).collect();
        assert_eq!(walked, nodes[1..6].to_vec());
    }

    #[test]
    fn test_skip_children() {
        let (doc, nodes) = tree();
        let mut walker = TreeWalker::new(&doc, doc.root());
        let mut seen = Vec::new();
        while let Some(node) = walker.next() {
            seen.push(node);
            if node == nodes[2] {
                walker.skip_children(node);
            }
        }
        // text "a" under the first paragraph is skipped
        assert!(!seen.contains(&nodes[3]));
        assert!(seen.contains(&nodes[5]));
    }

    #[test]
    fn test_compare_position() {
        let (doc, nodes) = tree();
        let (div, p1, a, b, span) = (nodes[1], nodes[2], nodes[3], nodes[5], nodes[6]);

        assert_eq!(doc.compare_position(a, b), Ordering::Less);
        assert_eq!(doc.compare_position(b, a), Ordering::Greater);
        assert_eq!(doc.compare_position(div, a), Ordering::Less);
        assert_eq!(doc.compare_position(span, p1), Ordering::Greater);
        assert_eq!(doc.compare_position(a, a), Ordering::Equal);
        assert!(doc.precedes(p1, b));
    }
}
