//! Anchoring pipeline: stored quote to live range
//!
//! The first content entry is resolved forward to find where the quote
//! starts; the last entry is resolved backward, bounded by that start, to
//! find where it ends. A quote that only partially matches is a failure.

mod builder;
mod locator;
mod resolver;
mod sequence;

pub use builder::RangeBuilder;
pub use locator::{block_container, decode, encode, query_selector, unique_selector, LocatorStrategy};
pub use resolver::{BoundaryResolver, Direction};
pub use sequence::{is_skippable, matchable, FlatNode, FlatSequence};

use tracing::debug;

use crate::dom::{Document, NodeId, Range};
use crate::error::{AnchorError, LocatorError};
use crate::quote::{Locators, Quote};

/// Resolves stored quotes against a document
#[derive(Debug, Clone, Copy, Default)]
pub struct Anchorer {
    strategy: LocatorStrategy,
}

impl Anchorer {
    pub fn new(strategy: LocatorStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> LocatorStrategy {
        self.strategy
    }

    /// Locators to store with a freshly captured range
    ///
    /// Text anchoring stores none.
    pub fn locators_for(&self, doc: &Document, range: &Range) -> Result<Option<Locators>, LocatorError> {
        match self.strategy {
            LocatorStrategy::Text => Ok(None),
            LocatorStrategy::Selector => Ok(Some(Locators {
                start: encode(doc, range.start.node)?,
                end: encode(doc, range.end.node)?,
            })),
        }
    }

    /// Search roots for the first and last content entries
    fn roots(&self, doc: &Document, quote: &Quote) -> Result<(NodeId, NodeId), AnchorError> {
        match self.strategy {
            LocatorStrategy::Text => Ok((doc.body(), doc.body())),
            LocatorStrategy::Selector => {
                let locators = quote.locators.as_ref().ok_or(AnchorError::MissingLocators)?;
                Ok((decode(doc, &locators.start)?, decode(doc, &locators.end)?))
            }
        }
    }

    /// Relocate a quote in the document
    pub fn anchor(&self, doc: &Document, quote: &Quote) -> Result<Range, AnchorError> {
        let (first, last) = match (quote.contents.first(), quote.contents.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(AnchorError::NoContents),
        };
        let (start_root, end_root) = self.roots(doc, quote)?;

        let start_resolver = BoundaryResolver::new(doc, start_root);
        let start = start_resolver
            .resolve(first, None, None)
            .map_err(AnchorError::Start)?;

        let span_hint: usize = quote.contents.iter().map(|entry| matchable(entry).len()).sum();
        let end = if end_root == start_root {
            start_resolver.resolve(last, Some(start), Some(span_hint))
        } else {
            BoundaryResolver::new(doc, end_root).resolve(last, Some(start), Some(span_hint))
        }
        .map_err(AnchorError::End)?;

        debug!(?start, ?end, entries = quote.contents.len(), "quote anchored");
        RangeBuilder::new()
            .set_start(start)
            .set_end(end)
            .build()
            .ok_or(AnchorError::NoContents)
    }
}
