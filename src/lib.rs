//! Quote Anchor
//!
//! Captures user selections on web pages as quotes and re-anchors stored
//! quotes on later visits, tolerating whitespace and markup drift.

pub mod anchor;
pub mod capture;
pub mod classify;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod markdown;
pub mod marks;
pub mod quote;
pub mod session;
pub mod store;

pub use anchor::{Anchorer, BoundaryResolver, LocatorStrategy, RangeBuilder};
pub use capture::{ContentExtractor, DataUrlResolver, HttpDataUrlResolver, SelectionDebouncer, Ticket};
pub use config::Config;
pub use dom::{Boundary, Document, NodeId, NodeKind, Range, Selection};
pub use engine::{LoadReport, MutationReport, QuoteEngine};
pub use error::{Error, Result};
pub use marks::{MarkId, MarkRegistry};
pub use quote::{normalize_url, Color, Locators, Quote, QuoteId};
pub use session::{DocumentSession, MutationEvent, Subscription};
pub use store::{MemoryQuoteStore, QuoteQuery, QuoteStore, SqliteQuoteStore};
