//! Error types for the quote engine
//!
//! Failures fall in two families. Environmental drift (a selection that
//! cannot be quoted, text that no longer matches, a store that is down) is
//! recoverable and handled per quote. Invariant violations, such as acting
//! on a mark the registry never created, indicate a logic defect and are
//! reported distinctly.

use thiserror::Error;

use crate::marks::MarkId;
use crate::quote::QuoteId;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Boundary resolution failed: {0}")]
    Resolve(#[from] ResolveFailure),

    #[error("Locator error: {0}")]
    Locator(#[from] LocatorError),

    #[error("Anchoring failed: {0}")]
    Anchor(#[from] AnchorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Mark registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Selection overlaps an existing highlight")]
    Unavailable,

    #[error("Selection changed while capturing")]
    Superseded,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error stems from environmental drift rather than a defect
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Registry(_))
    }
}

/// Why a selection produced no quote
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("selection spans multiple ranges")]
    MultipleRanges,

    #[error("selection is collapsed")]
    Collapsed,

    #[error("selection boundary is neither an element nor a text node")]
    UnsupportedContainer,

    #[error("selection contains no quotable content")]
    Empty,
}

/// Why a text fragment could not be located
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFailure {
    #[error("fragment has no matchable characters")]
    EmptyFragment,

    #[error("search root has no text or image content")]
    EmptyRoot,

    #[error("start boundary is not part of the search root")]
    StartNotIndexed,

    #[error("fragment not found")]
    Exhausted,

    #[error("match would end before the start boundary")]
    OrderViolation,
}

/// Selector locator encoding and lookup errors
#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("invalid locator encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("locator is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported selector: {0}")]
    InvalidSelector(String),

    #[error("no element matches selector: {0}")]
    NotFound(String),

    #[error("node has no element to locate")]
    NoElement,
}

/// Why a stored quote could not be anchored
#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("quote has no contents")]
    NoContents,

    #[error("quote has no locators")]
    MissingLocators,

    #[error("start not found: {0}")]
    Start(ResolveFailure),

    #[error("end not found: {0}")]
    End(ResolveFailure),

    #[error(transparent)]
    Locator(#[from] LocatorError),
}

/// Why an image could not be fetched for embedding
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("image source is not fetchable: {0}")]
    Unsupported(String),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("quote not found: {0}")]
    NotFound(QuoteId),

    #[error("quote already exists: {0}")]
    Duplicate(QuoteId),
}

/// Mark registry invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown mark {0}")]
    UnknownMark(MarkId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(Error::from(ExtractError::Collapsed).is_recoverable());
        assert!(Error::from(ResolveFailure::OrderViolation).is_recoverable());
        assert!(Error::from(AnchorError::Start(ResolveFailure::Exhausted)).is_recoverable());
        assert!(!Error::from(RegistryError::UnknownMark(MarkId::new())).is_recoverable());
    }

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(
            FetchError::Status(reqwest::StatusCode::NOT_FOUND).to_string(),
            "server returned 404 Not Found"
        );
        assert_eq!(
            FetchError::Unsupported("ftp://x.com/a.png".to_string()).to_string(),
            "image source is not fetchable: ftp://x.com/a.png"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = Error::from(AnchorError::End(ResolveFailure::OrderViolation));
        assert_eq!(
            err.to_string(),
            "Anchoring failed: end not found: match would end before the start boundary"
        );
    }
}
