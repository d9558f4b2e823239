//! Selection-change debouncing
//!
//! Every selection change bumps a generation counter. A capture attempt
//! holds the ticket of the change that triggered it and is abandoned as soon
//! as a newer change arrives, including after its image fetches complete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Generation of the selection change that started a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Coalesces bursts of selection changes
#[derive(Debug, Clone)]
pub struct SelectionDebouncer {
    generation: Arc<AtomicU64>,
    window: Duration,
}

impl Default for SelectionDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl SelectionDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a selection change
    pub fn bump(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no change happened since `ticket` was issued
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Wait out the debounce window; `false` if superseded meanwhile
    pub async fn settle(&self, ticket: Ticket) -> bool {
        tokio::time::sleep(self.window).await;
        self.is_current(ticket)
    }
}
