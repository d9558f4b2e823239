//! Live highlight bookkeeping
//!
//! The registry owns every mark painted in the current document, the quotes
//! that could not be anchored yet, and the running count of anchoring
//! failures. DOM writes made here are expected to run with mutation
//! observation paused.

use std::collections::HashMap;

use tracing::debug;

use super::render::{mark_attributes, MarkConfig, MARK_TAG};
use super::MarkId;
use crate::dom::{Document, NodeId, Range};
use crate::error::RegistryError;
use crate::quote::{Quote, QuoteId};

/// A quote painted in the document
#[derive(Debug, Clone)]
pub struct Mark {
    id: MarkId,
    quote: Quote,
    wrappers: Vec<NodeId>,
}

impl Mark {
    pub fn id(&self) -> MarkId {
        self.id
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    /// Wrapper elements, in document order
    pub fn wrappers(&self) -> &[NodeId] {
        &self.wrappers
    }

    /// Highlighted text
    pub fn text(&self, doc: &Document) -> String {
        self.wrappers.iter().map(|&w| doc.text_content(w)).collect()
    }
}

/// Registry of live marks
#[derive(Debug, Default)]
pub struct MarkRegistry {
    config: MarkConfig,
    marks: HashMap<MarkId, Mark>,
    order: Vec<MarkId>,
    unresolved: Vec<Quote>,
    failed: usize,
}

impl MarkRegistry {
    pub fn new(config: MarkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MarkConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Marks in creation order
    pub fn marks(&self) -> impl Iterator<Item = &Mark> + '_ {
        self.order.iter().filter_map(|id| self.marks.get(id))
    }

    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.marks.get(&id)
    }

    /// Mark currently painting the quote with identity `quote_id`
    pub fn find_by_quote(&self, quote_id: &QuoteId) -> Option<MarkId> {
        self.marks()
            .find(|mark| &mark.quote.id() == quote_id)
            .map(|mark| mark.id)
    }

    /// Mark whose wrapper contains `node`
    pub fn mark_at(&self, doc: &Document, node: NodeId) -> Option<MarkId> {
        self.marks()
            .find(|mark| mark.wrappers.iter().any(|&w| doc.contains(w, node)))
            .map(|mark| mark.id)
    }

    /// Whether `range` overlaps no existing mark
    pub fn is_available_range(&self, doc: &Document, range: &Range) -> bool {
        !self
            .marks
            .values()
            .flat_map(|mark| mark.wrappers.iter())
            .any(|&wrapper| range.intersects_node(doc, wrapper))
    }

    /// Wrap the content of `range` and record the mark
    ///
    /// Text nodes are split at the range boundaries; whitespace-only text is
    /// left unwrapped. Overlap is not checked here.
    pub fn create(&mut self, doc: &mut Document, range: &Range, quote: Quote) -> MarkId {
        let id = MarkId::new();
        let attrs = mark_attributes(&quote, id, &self.config);
        let attrs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let mut wrappers = Vec::new();
        for leaf in range.leaves(doc) {
            let target = if leaf.image {
                leaf.node
            } else {
                let text = doc.text(leaf.node).unwrap_or_default();
                let len = text.chars().count();
                let covered: String = text.chars().skip(leaf.start).take(leaf.end - leaf.start).collect();
                if covered.trim().is_empty() {
                    continue;
                }

                let mut target = leaf.node;
                if leaf.start > 0 {
                    match doc.split_text(target, leaf.start) {
                        Some(tail) => target = tail,
                        None => continue,
                    }
                }
                if leaf.end < len {
                    doc.split_text(target, leaf.end - leaf.start);
                }
                target
            };

            let Some(parent) = doc.parent(target) else {
                continue;
            };
            let wrapper = doc.create_element(MARK_TAG, &attrs);
            doc.insert_before(parent, wrapper, Some(target));
            doc.append_child(wrapper, target);
            wrappers.push(wrapper);
        }

        debug!(mark = %id, wrappers = wrappers.len(), "mark created");
        self.marks.insert(id, Mark { id, quote, wrappers });
        self.order.push(id);
        id
    }

    /// Unwrap a mark's content and drop the mark
    pub fn remove(&mut self, doc: &mut Document, id: MarkId) -> Result<Mark, RegistryError> {
        let mark = self.forget(id)?;

        let mut parents = Vec::new();
        for &wrapper in &mark.wrappers {
            let Some(parent) = doc.parent(wrapper) else {
                continue;
            };
            for child in doc.children(wrapper).to_vec() {
                doc.insert_before(parent, child, Some(wrapper));
            }
            doc.remove(wrapper);
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        for parent in parents {
            doc.normalize(parent);
        }

        debug!(mark = %id, "mark removed");
        Ok(mark)
    }

    /// Drop a mark without touching the document
    ///
    /// Used when the wrappers were already removed by someone else.
    pub fn forget(&mut self, id: MarkId) -> Result<Mark, RegistryError> {
        let mark = self.marks.remove(&id).ok_or(RegistryError::UnknownMark(id))?;
        self.order.retain(|&existing| existing != id);
        Ok(mark)
    }

    /// Replace the quote backing a mark
    pub fn update_quote(&mut self, id: MarkId, quote: Quote) -> Result<(), RegistryError> {
        let mark = self.marks.get_mut(&id).ok_or(RegistryError::UnknownMark(id))?;
        mark.quote = quote;
        Ok(())
    }

    /// Remember a quote that failed to anchor
    pub fn add_unresolved(&mut self, quote: Quote) {
        self.failed += 1;
        if !self.unresolved.contains(&quote) {
            self.unresolved.push(quote);
        }
    }

    /// Put a quote back in the unresolved set without counting a new failure
    pub fn requeue_unresolved(&mut self, quote: Quote) {
        if !self.unresolved.contains(&quote) {
            self.unresolved.push(quote);
        }
    }

    pub fn unresolved(&self) -> &[Quote] {
        &self.unresolved
    }

    /// Take the unresolved quotes for another anchoring attempt
    pub fn take_unresolved(&mut self) -> Vec<Quote> {
        std::mem::take(&mut self.unresolved)
    }

    /// Anchoring failures recorded so far
    pub fn failed_count(&self) -> usize {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Boundary, TreeWalker};
    use crate::quote::Color;

    fn text_node(doc: &Document, needle: &str) -> NodeId {
        TreeWalker::new(doc, doc.root())
            .find(|&n| doc.text(n) == Some(needle))
            .unwrap()
    }

    fn quote(text: &str) -> Quote {
        Quote::captured_at("https://x.com/a", vec![text.to_string()], Color::Yellow, 7).unwrap()
    }

    #[test]
    fn test_create_splits_and_wraps() {
        let mut doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let hello = text_node(&doc, "Hello ");
        let world = text_node(&doc, "world");
        let range = Range::new(Boundary::new(hello, 2), Boundary::new(world, 3));
        let mut registry = MarkRegistry::default();

        let id = registry.create(&mut doc, &range, quote("llo wor"));
        let mark = registry.get(id).unwrap();

        assert_eq!(mark.wrappers().len(), 2);
        assert_eq!(mark.text(&doc), "llo wor");
        let p = doc.first_child(doc.body()).unwrap();
        assert_eq!(doc.text_content(p), "Hello world!");
        assert!(doc.outer_html(p).starts_with("<p>He<mark class=\"quote-highlight quote-highlight-yellow\""));
    }

    #[test]
    fn test_remove_restores_markup() {
        let mut doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let p = doc.first_child(doc.body()).unwrap();
        let before = doc.outer_html(p);
        let hello = text_node(&doc, "Hello ");
        let world = text_node(&doc, "world");
        let range = Range::new(Boundary::new(hello, 2), Boundary::new(world, 3));
        let mut registry = MarkRegistry::default();

        let id = registry.create(&mut doc, &range, quote("llo wor"));
        let removed = registry.remove(&mut doc, id).unwrap();

        assert_eq!(removed.id(), id);
        assert!(registry.is_empty());
        assert_eq!(doc.outer_html(p), before);
    }

    #[test]
    fn test_unknown_mark_is_an_error() {
        let mut doc = Document::new();
        let mut registry = MarkRegistry::default();
        let id = MarkId::new();

        assert_eq!(registry.remove(&mut doc, id).unwrap_err(), RegistryError::UnknownMark(id));
        assert!(registry.forget(id).is_err());
        assert!(registry.update_quote(id, quote("x")).is_err());
    }

    #[test]
    fn test_availability() {
        let mut doc = Document::parse("<p>one two three</p>");
        let text = text_node(&doc, "one two three");
        let mut registry = MarkRegistry::default();
        registry.create(&mut doc, &Range::new(Boundary::new(text, 4), Boundary::new(text, 7)), quote("two"));

        let one = text_node(&doc, "one ");
        let three = text_node(&doc, " three");
        let two = doc.first_child(registry.marks().next().unwrap().wrappers()[0]).unwrap();

        assert!(registry.is_available_range(&doc, &Range::new(Boundary::new(one, 0), Boundary::new(one, 3))));
        assert!(registry.is_available_range(&doc, &Range::new(Boundary::new(three, 1), Boundary::new(three, 6))));
        assert!(!registry.is_available_range(&doc, &Range::new(Boundary::new(one, 2), Boundary::new(three, 2))));
        assert!(!registry.is_available_range(&doc, &Range::new(Boundary::new(two, 1), Boundary::new(two, 2))));
    }

    #[test]
    fn test_whitespace_leaves_are_not_wrapped() {
        let mut doc = Document::parse("<div><p>a</p>\n<p>b</p></div>");
        let a = text_node(&doc, "a");
        let b = text_node(&doc, "b");
        let mut registry = MarkRegistry::default();

        let id = registry.create(&mut doc, &Range::new(Boundary::new(a, 0), Boundary::new(b, 1)), quote("a"));
        assert_eq!(registry.get(id).unwrap().wrappers().len(), 2);
        assert_eq!(registry.mark_at(&doc, b), Some(id));
    }

    #[test]
    fn test_unresolved_bookkeeping() {
        let mut registry = MarkRegistry::default();
        registry.add_unresolved(quote("a"));
        registry.add_unresolved(quote("a"));
        registry.add_unresolved(quote("b"));

        assert_eq!(registry.unresolved().len(), 2);
        assert_eq!(registry.failed_count(), 3);
        assert_eq!(registry.take_unresolved().len(), 2);
        assert!(registry.unresolved().is_empty());

        registry.requeue_unresolved(quote("a"));
        assert_eq!(registry.unresolved().len(), 1);
        assert_eq!(registry.failed_count(), 3);
    }
}
