//! Text fragment to DOM boundary resolution
//!
//! The matcher walks the flattened sequence with two cursors, one over the
//! page text and one over the fragment. Skippable characters on either side
//! advance their own cursor without consuming a match, which absorbs
//! reflowed whitespace and code-span backticks. A mismatch abandons the
//! current candidate run and resumes one step past the candidate's first
//! character.
//!
//! Start boundaries are found scanning forward. End boundaries are found
//! scanning backward and never resolve before a supplied start.

use tracing::debug;

use super::sequence::{is_skippable, matchable, FlatSequence};
use crate::dom::{Boundary, Document, NodeId};
use crate::error::ResolveFailure;

/// Scan direction of the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Locates text fragments inside one search root
#[derive(Debug, Clone)]
pub struct BoundaryResolver<'a> {
    doc: &'a Document,
    root: NodeId,
    sequence: FlatSequence,
}

impl<'a> BoundaryResolver<'a> {
    pub fn new(doc: &'a Document, root: NodeId) -> Self {
        Self {
            doc,
            root,
            sequence: FlatSequence::build(doc, root),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn sequence(&self) -> &FlatSequence {
        &self.sequence
    }

    /// Resolve a fragment boundary
    ///
    /// Without `start` the fragment's first character is located scanning
    /// forward. With `start` the fragment's last character is located
    /// scanning backward, trying the window right after `start` first.
    /// `span_hint` is the expected number of matchable characters between
    /// the start and the end boundary.
    pub fn resolve(
        &self,
        fragment: &str,
        start: Option<Boundary>,
        span_hint: Option<usize>,
    ) -> Result<Boundary, ResolveFailure> {
        match start {
            None => self.resolve_start(fragment),
            Some(start) => self.resolve_end(fragment, start, span_hint),
        }
    }

    /// Boundary where the first occurrence of `fragment` begins
    pub fn resolve_start(&self, fragment: &str) -> Result<Boundary, ResolveFailure> {
        let target = self.target(fragment)?;
        let index = self
            .scan(&target, Direction::Forward, 0, self.sequence.len(), 0)?
            .ok_or(ResolveFailure::Exhausted)?;
        Ok(self.sequence.start_boundary(index))
    }

    /// Boundary where `fragment` ends, at or after `start`
    pub fn resolve_end(
        &self,
        fragment: &str,
        start: Boundary,
        span_hint: Option<usize>,
    ) -> Result<Boundary, ResolveFailure> {
        let target = self.target(fragment)?;
        let floor = self
            .sequence
            .position_of(self.doc, start)
            .ok_or(ResolveFailure::StartNotIndexed)?;

        if let Some(window_end) = span_hint.and_then(|hint| self.window_end(floor, hint)) {
            if let Ok(Some(index)) = self.scan(&target, Direction::Backward, floor, window_end, floor) {
                debug!(floor, window_end, "end boundary resolved in adjacent window");
                return Ok(self.sequence.end_boundary(index));
            }
        }

        let index = self
            .scan(&target, Direction::Backward, 0, self.sequence.len(), floor)?
            .ok_or(ResolveFailure::Exhausted)?;
        Ok(self.sequence.end_boundary(index))
    }

    fn target(&self, fragment: &str) -> Result<Vec<char>, ResolveFailure> {
        let target = matchable(fragment);
        if target.is_empty() {
            return Err(ResolveFailure::EmptyFragment);
        }
        if self.sequence.is_empty() {
            return Err(ResolveFailure::EmptyRoot);
        }
        Ok(target)
    }

    /// End (exclusive) of the window holding `hint` matchable characters from `from`
    fn window_end(&self, from: usize, hint: usize) -> Option<usize> {
        let mut count = 0;
        for index in from..self.sequence.len() {
            if is_skippable(self.sequence.char_at(index)) {
                continue;
            }
            count += 1;
            if count == hint {
                return Some(index + 1);
            }
        }
        None
    }

    /// Run the matcher over `[lo, hi)`
    ///
    /// Forward scans return the index of the fragment's first character,
    /// backward scans the index of its last character. A backward scan that
    /// steps below `floor` fails with an order violation.
    fn scan(
        &self,
        target: &[char],
        direction: Direction,
        lo: usize,
        hi: usize,
        floor: usize,
    ) -> Result<Option<usize>, ResolveFailure> {
        let seq = &self.sequence;
        let mut cursor = match direction {
            Direction::Forward => Some(lo),
            Direction::Backward => hi.checked_sub(1),
        };
        let mut matched = 0;
        let mut candidate: Option<usize> = None;

        while let Some(i) = cursor.filter(|&i| i >= lo && i < hi) {
            if direction == Direction::Backward && i < floor {
                return Err(ResolveFailure::OrderViolation);
            }

            let c = seq.char_at(i);
            if is_skippable(c) {
                cursor = step(i, direction);
                continue;
            }

            let expected = match direction {
                Direction::Forward => target[matched],
                Direction::Backward => target[target.len() - 1 - matched],
            };

            if c == expected {
                let first = *candidate.get_or_insert(i);
                matched += 1;
                if matched == target.len() {
                    return Ok(Some(first));
                }
                cursor = step(i, direction);
            } else if let Some(abandoned) = candidate.take() {
                matched = 0;
                cursor = step(abandoned, direction);
            } else {
                cursor = step(i, direction);
            }
        }
        Ok(None)
    }
}

fn step(index: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Forward => index.checked_add(1),
        Direction::Backward => index.checked_sub(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_node(doc: &Document, needle: &str) -> NodeId {
        crate::dom::TreeWalker::new(doc, doc.root())
            .find(|&n| doc.text(n) == Some(needle))
            .unwrap()
    }

    #[test]
    fn test_forward_across_inline_markup() {
        let doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let hello = text_node(&doc, "Hello ");

        let start = resolver.resolve("Hello world", None, None).unwrap();
        assert_eq!(start, Boundary::new(hello, 0));
    }

    #[test]
    fn test_backward_end_boundary() {
        let doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let world = text_node(&doc, "world");

        let start = resolver.resolve_start("Hello world").unwrap();
        let end = resolver.resolve("Hello world", Some(start), Some(10)).unwrap();
        assert_eq!(end, Boundary::new(world, 5));
    }

    #[test]
    fn test_whitespace_tolerance() {
        let doc = Document::parse("<p>a\n  b</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let text = text_node(&doc, "a\n  b");

        let start = resolver.resolve_start("a b").unwrap();
        assert_eq!(start, Boundary::new(text, 0));
        let end = resolver.resolve_end("a b", start, Some(2)).unwrap();
        assert_eq!(end, Boundary::new(text, 5));
    }

    #[test]
    fn test_rewind_after_partial_candidate() {
        // "aab" needs a rewind to index 1 after the first candidate fails
        let doc = Document::parse("<p>aaab</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let text = text_node(&doc, "aaab");

        assert_eq!(resolver.resolve_start("aab").unwrap(), Boundary::new(text, 1));
    }

    #[test]
    fn test_order_violation() {
        let doc = Document::parse("<p>tail</p><p>head</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let head = text_node(&doc, "head");

        let result = resolver.resolve_end("tail", Boundary::new(head, 0), Some(4));
        assert_eq!(result, Err(ResolveFailure::OrderViolation));
    }

    #[test]
    fn test_image_boundaries_have_zero_offset() {
        let doc = Document::parse(r#"<p><img alt="fig" src="a.png"> caption <img alt="end" src="b.png"></p>"#);
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let images: Vec<NodeId> = crate::dom::TreeWalker::new(&doc, doc.root())
            .filter(|&n| doc.tag_name(n) == Some("img"))
            .collect();

        let start = resolver.resolve_start("![fig](data:image/png;base64,AA==) caption").unwrap();
        assert_eq!(start, Boundary::new(images[0], 0));
        let end = resolver.resolve_end("caption ![end](data:x)", start, None).unwrap();
        assert_eq!(end, Boundary::new(images[1], 0));
    }

    #[test]
    fn test_failures() {
        let doc = Document::parse("<p>content</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        assert_eq!(resolver.resolve_start(" \n "), Err(ResolveFailure::EmptyFragment));
        assert_eq!(resolver.resolve_start("missing"), Err(ResolveFailure::Exhausted));

        let empty = Document::parse("<p></p>");
        let resolver = BoundaryResolver::new(&empty, empty.body());
        assert_eq!(resolver.resolve_start("x"), Err(ResolveFailure::EmptyRoot));
    }

    #[test]
    fn test_start_outside_root_after_it() {
        let doc = Document::parse("<p>one</p><p>two</p>");
        let body = doc.body();
        let first = doc.children(body)[0];
        let two = text_node(&doc, "two");

        let resolver = BoundaryResolver::new(&doc, first);
        let result = resolver.resolve_end("one", Boundary::new(two, 0), None);
        assert_eq!(result, Err(ResolveFailure::StartNotIndexed));
    }

    #[test]
    fn test_fast_path_prefers_adjacent_occurrence() {
        let doc = Document::parse("<p>Hello world, Hello world again</p>");
        let resolver = BoundaryResolver::new(&doc, doc.body());
        let text = resolver.sequence().leaves()[0].node;

        let start = resolver.resolve_start("Hello world").unwrap();
        let adjacent = resolver.resolve_end("Hello world", start, Some(10)).unwrap();
        assert_eq!(adjacent, Boundary::new(text, 11));

        // Without a hint the backward scan settles on the last occurrence
        let last = resolver.resolve_end("Hello world", start, None).unwrap();
        assert_eq!(last, Boundary::new(text, 24));
    }
}
