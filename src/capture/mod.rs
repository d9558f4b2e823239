//! Capture pipeline: live selection to quote contents

mod debounce;
mod extractor;
mod fetch;

pub use debounce::{SelectionDebouncer, Ticket};
pub use extractor::ContentExtractor;
pub use fetch::{to_data_url, DataUrlResolver, HttpDataUrlResolver, OfflineDataUrlResolver};

#[cfg(test)]
pub(crate) use fetch::MockResolver;
