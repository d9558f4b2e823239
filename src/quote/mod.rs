//! Quote data model
//!
//! Quotes are owned by the persistence layer; the engine only borrows them
//! to build transient marks.

mod types;
mod url;

pub use types::{Color, Locators, NoteRef, Quote, QuoteId};
pub use self::url::normalize_url;
