//! Mutation notifier
//!
//! Subscribers receive mutation events over unbounded channels. A
//! subscription stays registered for as long as its handle lives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::dom::{Document, MutationRecord, NodeId};
use crate::marks::MarkId;

/// What changed in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent {
    /// Nodes were inserted (or had their text replaced)
    ContentAdded { nodes: Vec<NodeId> },
    /// A mark's wrapper elements left the document
    QuoteRemoved(MarkId),
}

#[derive(Debug, Default)]
struct Inner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<MutationEvent>)>>,
    watched: Mutex<HashMap<NodeId, MarkId>>,
}

/// Fans mutation events out to subscribers
#[derive(Debug, Clone, Default)]
pub struct MutationNotifier {
    inner: Arc<Inner>,
}

impl MutationNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; dropping the handle unsubscribes
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push((id, tx));
        Subscription {
            id,
            inner: Arc::clone(&self.inner),
            receiver: rx,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Report `mark` as removed once any of `nodes` leaves the document
    pub fn watch(&self, mark: MarkId, nodes: &[NodeId]) {
        let mut watched = self.inner.watched.lock();
        for &node in nodes {
            watched.insert(node, mark);
        }
    }

    pub fn unwatch(&self, mark: MarkId) {
        self.inner.watched.lock().retain(|_, watched| *watched != mark);
    }

    pub fn is_watched(&self, mark: MarkId) -> bool {
        self.inner.watched.lock().values().any(|&watched| watched == mark)
    }

    /// Turn journal records into events and deliver them
    pub(crate) fn dispatch(&self, doc: &Document, records: &[MutationRecord]) -> Vec<MutationEvent> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut events = Vec::new();
        {
            let mut watched = self.inner.watched.lock();
            let mut removed: Vec<MarkId> = Vec::new();
            for (&node, &mark) in watched.iter() {
                if !doc.is_connected(node) && !removed.contains(&mark) {
                    removed.push(mark);
                }
            }
            watched.retain(|_, mark| !removed.contains(mark));
            events.extend(removed.into_iter().map(MutationEvent::QuoteRemoved));
        }

        let mut added: Vec<NodeId> = Vec::new();
        for record in records {
            let node = match *record {
                MutationRecord::ChildAdded { child, .. } => child,
                MutationRecord::TextChanged(node) => node,
                MutationRecord::ChildRemoved { .. } => continue,
            };
            if doc.is_connected(node) && !added.contains(&node) {
                added.push(node);
            }
        }
        if !added.is_empty() {
            events.push(MutationEvent::ContentAdded { nodes: added });
        }

        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|(_, tx)| !tx.is_closed());
        for event in &events {
            for (_, tx) in subscribers.iter() {
                let _ = tx.send(event.clone());
            }
        }
        debug!(
            events = events.len(),
            subscribers = subscribers.len(),
            "mutations dispatched"
        );
        events
    }
}

/// Live subscription to mutation events
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    inner: Arc<Inner>,
    receiver: mpsc::UnboundedReceiver<MutationEvent>,
}

impl Subscription {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<MutationEvent> {
        self.receiver.recv().await
    }

    /// Next event if one is queued
    pub fn try_recv(&mut self) -> Option<MutationEvent> {
        self.receiver.try_recv().ok()
    }

    /// All queued events
    pub fn drain(&mut self) -> Vec<MutationEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.subscribers.lock().retain(|(id, _)| *id != self.id);
    }
}
