//! Quote engine
//!
//! Wires capture and anchoring together for one page. Stored quotes are
//! anchored on load; new selections are extracted, persisted and only then
//! painted. Marks are always painted with mutation observation paused, and
//! the mutation notifier is told which wrappers to watch.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::anchor::Anchorer;
use crate::capture::{ContentExtractor, DataUrlResolver, SelectionDebouncer, Ticket};
use crate::config::Config;
use crate::dom::{Range, Selection};
use crate::error::{Error, ExtractError, RegistryError, Result};
use crate::marks::{MarkId, MarkRegistry};
use crate::quote::{Color, Quote};
use crate::session::{DocumentSession, MutationEvent};
use crate::store::{QuoteQuery, QuoteStore};

/// Outcome of loading a page's stored quotes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Marks painted by this load
    pub anchored: Vec<MarkId>,
    /// Quotes that could not be anchored
    pub failed: usize,
}

/// Outcome of processing queued document mutations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    /// Marks whose wrappers were removed by the page
    pub removed: Vec<MarkId>,
    /// Marks painted for previously unresolved quotes
    pub reanchored: Vec<MarkId>,
}

/// Capture and re-anchoring for a single page
pub struct QuoteEngine<S: QuoteStore, R: DataUrlResolver> {
    store: S,
    resolver: R,
    anchorer: Anchorer,
    registry: MarkRegistry,
    debouncer: SelectionDebouncer,
}

impl<S: QuoteStore, R: DataUrlResolver> QuoteEngine<S, R> {
    pub fn new(store: S, resolver: R, config: &Config) -> Self {
        Self {
            store,
            resolver,
            anchorer: Anchorer::new(config.engine.locator_strategy),
            registry: MarkRegistry::new(config.marks.clone()),
            debouncer: SelectionDebouncer::new(Duration::from_millis(config.engine.debounce_ms)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &MarkRegistry {
        &self.registry
    }

    pub fn anchorer(&self) -> &Anchorer {
        &self.anchorer
    }

    pub fn debouncer(&self) -> &SelectionDebouncer {
        &self.debouncer
    }

    /// Record a selection change and get the ticket for the capture it may start
    pub fn selection_changed(&self) -> Ticket {
        self.debouncer.bump()
    }

    /// Anchor and paint every stored quote for the session's page
    pub async fn load(&mut self, session: &mut DocumentSession) -> Result<LoadReport> {
        let quotes = self.store.list(&QuoteQuery::for_page(session.url())).await?;
        let mut report = LoadReport::default();

        for quote in quotes {
            if self.registry.find_by_quote(&quote.id()).is_some() {
                continue;
            }
            match self.anchorer.anchor(session.document(), &quote) {
                Ok(range) => report.anchored.push(self.paint(session, &range, quote)),
                Err(e) => {
                    debug!(quote = %quote.id(), error = %e, "quote did not anchor");
                    self.registry.add_unresolved(quote);
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            warn!("{} quotes failed to load", report.failed);
        }
        info!(
            url = %session.normalized_url(),
            anchored = report.anchored.len(),
            failed = report.failed,
            "page quotes loaded"
        );
        Ok(report)
    }

    /// Capture the selection as a new quote and highlight it
    ///
    /// The mark is painted only after the quote is persisted. A selection
    /// change after `ticket` was issued abandons the capture.
    pub async fn capture(
        &mut self,
        session: &mut DocumentSession,
        selection: &Selection,
        color: Color,
        comment: &str,
        ticket: Ticket,
    ) -> Result<MarkId> {
        if let Some(range) = selection.single() {
            if !self.registry.is_available_range(session.document(), range) {
                return Err(Error::Unavailable);
            }
        }

        let contents = ContentExtractor::new(&self.resolver, session.url())
            .extract(session.document(), selection)
            .await?;
        if !self.debouncer.is_current(ticket) {
            debug!("capture superseded by a newer selection");
            return Err(Error::Superseded);
        }

        let range = selection.single().ok_or(ExtractError::MultipleRanges)?;
        let mut quote = Quote::new(session.url(), contents, color)
            .ok_or(ExtractError::Empty)?
            .with_comment(comment);
        if let Some(locators) = self.anchorer.locators_for(session.document(), range)? {
            quote = quote.with_locators(locators);
        }

        let stored = self.store.create(quote).await?;
        info!(quote = %stored.id(), entries = stored.contents.len(), "quote captured");
        Ok(self.paint(session, range, stored))
    }

    /// Clipboard-only capture: Markdown for the selection, nothing stored or painted
    pub async fn copy(&self, session: &DocumentSession, selection: &Selection) -> Result<String> {
        let contents = ContentExtractor::new(&self.resolver, session.url())
            .extract(session.document(), selection)
            .await?;
        let quote = Quote::new(session.url(), contents, Color::default()).ok_or(ExtractError::Empty)?;
        Ok(quote.to_markdown())
    }

    /// Persist a new comment for a mark's quote and refresh its wrappers
    pub async fn update_comment(
        &mut self,
        session: &mut DocumentSession,
        mark: MarkId,
        comment: &str,
    ) -> Result<Quote> {
        let current = self
            .registry
            .get(mark)
            .ok_or(RegistryError::UnknownMark(mark))?;
        let edited = current.quote().clone().with_comment(comment);
        let wrappers = current.wrappers().to_vec();

        let stored = self.store.update(edited).await?;
        self.registry.update_quote(mark, stored.clone())?;

        let title = stored.comment.trim().to_string();
        let mut doc = session.unobserved();
        for wrapper in wrappers {
            doc.set_attr(wrapper, "title", &title);
        }
        Ok(stored)
    }

    /// Delete a mark's quote from the store, then unpaint it
    pub async fn delete(&mut self, session: &mut DocumentSession, mark: MarkId) -> Result<Quote> {
        let quote = self
            .registry
            .get(mark)
            .ok_or(RegistryError::UnknownMark(mark))?
            .quote()
            .clone();

        self.store.delete(&quote).await?;
        {
            let mut doc = session.unobserved();
            self.registry.remove(&mut doc, mark)?;
        }
        session.notifier().unwatch(mark);
        info!(quote = %quote.id(), "quote deleted");
        Ok(quote)
    }

    /// React to document changes made since the last flush
    ///
    /// Marks whose wrappers left the document are unpainted and their quotes
    /// become unresolved. New content triggers another anchoring attempt for
    /// every unresolved quote.
    pub async fn process_mutations(&mut self, session: &mut DocumentSession) -> Result<MutationReport> {
        let mut report = MutationReport::default();
        let mut content_added = false;

        for event in session.flush_mutations() {
            match event {
                MutationEvent::QuoteRemoved(mark) => {
                    let removed = {
                        let mut doc = session.unobserved();
                        self.registry.remove(&mut doc, mark)?
                    };
                    debug!(mark = %mark, "mark removed by page");
                    self.registry.requeue_unresolved(removed.quote().clone());
                    report.removed.push(mark);
                }
                MutationEvent::ContentAdded { .. } => content_added = true,
            }
        }

        if content_added {
            for quote in self.registry.take_unresolved() {
                let range = match self.anchorer.anchor(session.document(), &quote) {
                    Ok(range) if self.registry.is_available_range(session.document(), &range) => range,
                    Ok(_) => {
                        debug!(quote = %quote.id(), "anchored over an existing mark");
                        self.registry.requeue_unresolved(quote);
                        continue;
                    }
                    Err(e) => {
                        debug!(quote = %quote.id(), error = %e, "quote still unresolved");
                        self.registry.requeue_unresolved(quote);
                        continue;
                    }
                };
                report.reanchored.push(self.paint(session, &range, quote));
            }
        }

        if !report.removed.is_empty() || !report.reanchored.is_empty() {
            info!(
                removed = report.removed.len(),
                reanchored = report.reanchored.len(),
                "mutations processed"
            );
        }
        Ok(report)
    }

    fn paint(&mut self, session: &mut DocumentSession, range: &Range, quote: Quote) -> MarkId {
        let (id, wrappers) = {
            let mut doc = session.unobserved();
            let id = self.registry.create(&mut doc, range, quote);
            let wrappers = self
                .registry
                .get(id)
                .map(|mark| mark.wrappers().to_vec())
                .unwrap_or_default();
            (id, wrappers)
        };
        session.notifier().watch(id, &wrappers);
        id
    }
}
