//! Document session
//!
//! The session is the explicit context every component works against: the
//! live document, the page URL and the mutation notifier. Writes go through
//! one of two doors. `document_mut` is an observed write, as a page script
//! would make. `unobserved` hands out a guard whose writes never reach
//! subscribers, which is how the engine paints and removes its own marks.

mod observer;

pub use observer::{MutationEvent, MutationNotifier, Subscription};

use std::ops::{Deref, DerefMut};

use crate::dom::Document;
use crate::quote::normalize_url;

/// Live document plus its observation state
#[derive(Debug)]
pub struct DocumentSession {
    document: Document,
    url: String,
    notifier: MutationNotifier,
}

impl DocumentSession {
    pub fn new(document: Document, url: &str) -> Self {
        Self {
            document,
            url: url.to_string(),
            notifier: MutationNotifier::new(),
        }
    }

    /// Parse `html` and open a session on it
    pub fn parse(html: &str, url: &str) -> Self {
        Self::new(Document::parse(html), url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Page URL used to look up stored quotes
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Observed write access
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Write access whose mutations are not reported
    pub fn unobserved(&mut self) -> ObserverPause<'_> {
        let resume_at = self.document.journal_len();
        ObserverPause {
            document: &mut self.document,
            resume_at,
        }
    }

    pub fn notifier(&self) -> &MutationNotifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Deliver queued mutations to subscribers and return them
    pub fn flush_mutations(&mut self) -> Vec<MutationEvent> {
        let records = self.document.drain_journal();
        self.notifier.dispatch(&self.document, &records)
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Scoped suspension of mutation observation
///
/// Records journaled while the guard lives are discarded when it drops.
#[derive(Debug)]
pub struct ObserverPause<'a> {
    document: &'a mut Document,
    resume_at: usize,
}

impl Deref for ObserverPause<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        &*self.document
    }
}

impl DerefMut for ObserverPause<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        &mut *self.document
    }
}

impl Drop for ObserverPause<'_> {
    fn drop(&mut self) {
        self.document.truncate_journal(self.resume_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unobserved_writes_are_silent() {
        let mut session = DocumentSession::parse("<p>a</p>", "https://x.com/a?b=1");
        let mut subscription = session.subscribe();

        {
            let mut doc = session.unobserved();
            let body = doc.body();
            let p = doc.create_element("p", &[]);
            doc.append_child(body, p);
        }
        assert!(session.flush_mutations().is_empty());
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn test_observed_writes_survive_a_pause() {
        let mut session = DocumentSession::parse("<p>a</p>", "https://x.com/a");
        let body = session.document().body();
        let added = session.document_mut().create_text("external");
        session.document_mut().append_child(body, added);

        {
            let mut doc = session.unobserved();
            let mine = doc.create_text("mine");
            doc.append_child(body, mine);
        }

        let events = session.flush_mutations();
        assert_eq!(events, vec![MutationEvent::ContentAdded { nodes: vec![added] }]);
    }

    #[test]
    fn test_normalized_url() {
        let session = DocumentSession::parse("", "https://x.com/a?x=1#frag");
        assert_eq!(session.normalized_url(), "https://x.com/a");
        assert_eq!(session.url(), "https://x.com/a?x=1#frag");
    }
}
