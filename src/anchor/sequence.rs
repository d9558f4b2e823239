//! Flattened leaf sequence
//!
//! Walking a subtree and concatenating its visible text and image leaves
//! yields one character sequence in document order. Every character keeps a
//! back-reference to the leaf it came from and its offset inside that leaf,
//! so a position in the sequence maps straight back to a DOM boundary.

use std::cmp::Ordering;

use crate::classify::{self, image_token};
use crate::dom::{compare_points, Boundary, Document, NodeId, TreeWalker};
use crate::markdown;

/// A leaf of the flattened sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode {
    pub node: NodeId,
    /// Index of the leaf's first character in the sequence
    pub start: usize,
    /// One past the index of the leaf's last character
    pub end: usize,
    pub image: bool,
}

/// Text and image leaves of a subtree, flattened into one character run
#[derive(Debug, Clone, Default)]
pub struct FlatSequence {
    chars: Vec<char>,
    owners: Vec<usize>,
    offsets: Vec<usize>,
    nodes: Vec<FlatNode>,
}

impl FlatSequence {
    /// Flatten every visible text and image leaf under `root`
    pub fn build(doc: &Document, root: NodeId) -> Self {
        let mut seq = Self::default();
        let mut walker = TreeWalker::new(doc, root);
        while let Some(node) = walker.next() {
            if doc.is_element(node) && classify::is_invisible(doc, node) {
                walker.skip_children(node);
                continue;
            }
            if let Some(text) = doc.text(node) {
                seq.push_leaf(node, false, text.chars().enumerate());
            } else if classify::is_image(doc, node) {
                let token = image_token(doc, node);
                seq.push_leaf(node, true, token.chars().map(|c| (0, c)));
            }
        }
        seq
    }

    fn push_leaf(&mut self, node: NodeId, image: bool, chars: impl Iterator<Item = (usize, char)>) {
        let start = self.chars.len();
        let owner = self.nodes.len();
        for (offset, c) in chars {
            self.chars.push(c);
            self.owners.push(owner);
            self.offsets.push(offset);
        }
        if self.chars.len() > start {
            self.nodes.push(FlatNode {
                node,
                start,
                end: self.chars.len(),
                image,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, index: usize) -> char {
        self.chars[index]
    }

    /// Leaf owning the character at `index`
    pub fn leaf_at(&self, index: usize) -> &FlatNode {
        &self.nodes[self.owners[index]]
    }

    /// Offset of the character at `index` inside its leaf
    pub fn offset_at(&self, index: usize) -> usize {
        self.offsets[index]
    }

    pub fn leaves(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Sequence index of a boundary point
    ///
    /// Boundaries inside an indexed leaf map to the matching character (an
    /// image maps to its first token character). A boundary that precedes
    /// every leaf maps to 0. Anything else is not part of the sequence.
    pub fn position_of(&self, doc: &Document, boundary: Boundary) -> Option<usize> {
        if let Some(leaf) = self.nodes.iter().find(|leaf| leaf.node == boundary.node) {
            let index = if leaf.image {
                leaf.start
            } else {
                (leaf.start + boundary.offset).min(leaf.end)
            };
            return Some(index);
        }
        let first = self.nodes.first()?;
        match compare_points(doc, boundary, Boundary::new(first.node, 0)) {
            Ordering::Less | Ordering::Equal => Some(0),
            Ordering::Greater => None,
        }
    }

    /// Boundary of the character at `index` when it opens a match
    pub fn start_boundary(&self, index: usize) -> Boundary {
        let leaf = self.leaf_at(index);
        let offset = if leaf.image { 0 } else { self.offsets[index] };
        Boundary::new(leaf.node, offset)
    }

    /// Boundary just past the character at `index` when it closes a match
    pub fn end_boundary(&self, index: usize) -> Boundary {
        let leaf = self.leaf_at(index);
        let offset = if leaf.image { 0 } else { self.offsets[index] + 1 };
        Boundary::new(leaf.node, offset)
    }
}

/// Characters ignored on both sides while matching
pub fn is_skippable(c: char) -> bool {
    c.is_whitespace() || c == '`'
}

/// Matchable characters of a stored fragment
///
/// Markdown added at capture time is reduced to what the page renders:
/// images to `![alt]`, links to their text, escapes to the escaped
/// character. Skippable characters are dropped.
pub fn matchable(fragment: &str) -> Vec<char> {
    markdown::page_text(fragment)
        .chars()
        .filter(|&c| !is_skippable(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_text_and_images() {
        let doc = Document::parse(r#"<p>Hi <img alt="cat" src="c.png"> there<script>x()</script></p>"#);
        let seq = FlatSequence::build(&doc, doc.body());

        let text: String = (0..seq.len()).map(|i| seq.char_at(i)).collect();
        assert_eq!(text, "Hi ![cat] there");
        assert_eq!(seq.leaves().len(), 3);
        assert!(seq.leaves()[1].image);
        assert_eq!(seq.offset_at(4), 0);
        assert_eq!(seq.offset_at(11), 2);
    }

    #[test]
    fn test_boundaries_for_images_are_zero() {
        let doc = Document::parse(r#"<p><img alt="cat" src="c.png"></p>"#);
        let seq = FlatSequence::build(&doc, doc.body());
        let img = seq.leaves()[0].node;

        assert_eq!(seq.start_boundary(2), Boundary::new(img, 0));
        assert_eq!(seq.end_boundary(seq.len() - 1), Boundary::new(img, 0));
    }

    #[test]
    fn test_position_of() {
        let doc = Document::parse("<p>ab</p><p>cd</p>");
        let body = doc.body();
        let second = doc.children(body)[1];
        let seq = FlatSequence::build(&doc, second);
        let cd = seq.leaves()[0].node;
        let ab = doc.first_child(doc.children(body)[0]).unwrap_or(cd);

        assert_eq!(seq.position_of(&doc, Boundary::new(cd, 1)), Some(1));
        assert_eq!(seq.position_of(&doc, Boundary::new(ab, 0)), Some(0));

        let first = FlatSequence::build(&doc, doc.children(body)[0]);
        assert_eq!(first.position_of(&doc, Boundary::new(cd, 0)), None);
    }

    #[test]
    fn test_matchable_strips_markdown() {
        let chars: String = matchable("see `code` and [the docs](https://x.com/d) ![cat](data:image/png;base64,AA== \"Cat\")").into_iter().collect();
        assert_eq!(chars, "seecodeandthedocs![cat]");
    }

    #[test]
    fn test_matchable_keeps_escaped_page_text() {
        let chars: String = matchable("Wow\\![link](https://x.com/l) \\[docs\\]").into_iter().collect();
        assert_eq!(chars, "Wow!link[docs]");
    }

    #[test]
    fn test_matchable_image_inside_link() {
        let chars: String = matchable("[![logo](data:x)](https://x.com)").into_iter().collect();
        assert_eq!(chars, "![logo]");
    }
}
