//! Boundary points, ranges and selections
//!
//! Offsets follow the DOM convention: a char offset inside text nodes and a
//! child index inside elements. Images are atomic: a range touching an image
//! boundary covers the whole image.

use std::cmp::Ordering;

use super::{Document, NodeId, TreeWalker};
use crate::classify::{self, image_token};

/// One endpoint of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A contiguous span between two boundary points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

/// A covered leaf: a text slice `[start, end)` or a whole image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafSlice {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
    pub image: bool,
}

/// A user selection, possibly made of several discontiguous ranges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub ranges: Vec<Range>,
}

impl Selection {
    pub fn new(range: Range) -> Self {
        Self { ranges: vec![range] }
    }

    /// The only range of a single-range selection
    pub fn single(&self) -> Option<&Range> {
        match self.ranges.as_slice() {
            [range] => Some(range),
            _ => None,
        }
    }
}

/// Order two boundary points in document order
pub fn compare_points(doc: &Document, a: Boundary, b: Boundary) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    if doc.contains(a.node, b.node) {
        return compare_with_descendant(doc, a, b.node);
    }
    if doc.contains(b.node, a.node) {
        return compare_with_descendant(doc, b, a.node).reverse();
    }
    doc.compare_position(a.node, b.node)
}

/// Compare an ancestor boundary with any point inside `descendant`
fn compare_with_descendant(doc: &Document, ancestor: Boundary, descendant: NodeId) -> Ordering {
    let child = std::iter::once(descendant)
        .chain(doc.ancestors(descendant))
        .find(|&node| doc.parent(node) == Some(ancestor.node));
    let index = child.and_then(|c| doc.index_in_parent(c)).unwrap_or(0);
    if ancestor.offset <= index {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

impl Range {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Deepest node containing both boundary containers
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        doc.common_ancestor(self.start.node, self.end.node)
    }

    /// Visible text and image leaves covered by the range, in document order
    pub fn leaves(&self, doc: &Document) -> Vec<LeafSlice> {
        let Some(root) = self.common_ancestor(doc) else {
            return Vec::new();
        };

        let mut leaves = Vec::new();
        let mut walker = TreeWalker::new(doc, root);
        while let Some(node) = walker.next() {
            if doc.is_element(node) && classify::is_invisible(doc, node) {
                walker.skip_children(node);
                continue;
            }

            if let Some(text) = doc.text(node) {
                let len = text.chars().count();
                if !self.touches(doc, node, len) {
                    continue;
                }
                let start = if node == self.start.node { self.start.offset.min(len) } else { 0 };
                let end = if node == self.end.node { self.end.offset.min(len) } else { len };
                if start < end {
                    leaves.push(LeafSlice { node, start, end, image: false });
                }
            } else if classify::is_image(doc, node) && self.touches(doc, node, 0) {
                leaves.push(LeafSlice { node, start: 0, end: 0, image: true });
            }
        }
        leaves
    }

    /// Whether a leaf of the given length lies inside the range
    fn touches(&self, doc: &Document, node: NodeId, len: usize) -> bool {
        let after_start = node == self.start.node
            || compare_points(doc, Boundary::new(node, len), self.start) == Ordering::Greater;
        let before_end = node == self.end.node
            || compare_points(doc, Boundary::new(node, 0), self.end) == Ordering::Less;
        after_start && before_end
    }

    /// Covered text, with images rendered as `![alt]`
    pub fn text(&self, doc: &Document) -> String {
        self.leaves(doc)
            .iter()
            .map(|leaf| {
                let node = leaf.node;
                if leaf.image {
                    image_token(doc, node)
                } else {
                    doc.text(node)
                        .unwrap_or_default()
                        .chars()
                        .skip(leaf.start)
                        .take(leaf.end - leaf.start)
                        .collect()
                }
            })
            .collect()
    }

    /// Whether any part of `node` falls inside the range
    pub fn intersects_node(&self, doc: &Document, node: NodeId) -> bool {
        if !doc.is_connected(node) {
            return false;
        }
        let (Some(parent), Some(index)) = (doc.parent(node), doc.index_in_parent(node)) else {
            // The root intersects everything
            return true;
        };
        let node_start = Boundary::new(parent, index);
        let node_end = Boundary::new(parent, index + 1);
        compare_points(doc, node_start, self.end) == Ordering::Less
            && compare_points(doc, node_end, self.start) == Ordering::Greater
    }
}
