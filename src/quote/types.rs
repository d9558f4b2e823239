//! Quote types
//!
//! A quote is the persisted annotation unit: where it was captured, the
//! normalized text it covers, and how it is displayed. Identity is derived
//! from the fields that never change after capture.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::url::normalize_url;

/// Highlight colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
}

impl Color {
    pub const ALL: [Color; 5] = [
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Pink,
        Color::Purple,
    ];

    /// Lowercase name, as used in class names and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Pink => "pink",
            Color::Purple => "purple",
        }
    }

    /// CSS color value used when painting marks
    pub fn css_value(&self) -> &'static str {
        match self {
            Color::Yellow => "#fff59d",
            Color::Green => "#c5e1a5",
            Color::Blue => "#90caf9",
            Color::Pink => "#f48fb1",
            Color::Purple => "#ce93d8",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded references to the start and end container elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locators {
    pub start: String,
    pub end: String,
}

/// Back-reference to a note in an external note store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
    pub id: String,
    pub path: String,
}

/// Stable identity of a quote (hex SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(String);

impl QuoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A captured annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Page URL at capture time
    pub source_url: String,
    /// One normalized entry per block spanned by the selection
    pub contents: Vec<String>,
    /// Start/end container selectors (selector-based anchoring only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locators: Option<Locators>,
    /// User comment
    #[serde(default)]
    pub comment: String,
    pub color: Color,
    /// Capture time in epoch milliseconds
    pub created_at: i64,
    /// Set once the quote is persisted to an external note store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteRef>,
}

impl Quote {
    /// Create a quote captured now
    ///
    /// Returns `None` when there is no content to quote.
    pub fn new(source_url: &str, contents: Vec<String>, color: Color) -> Option<Self> {
        Self::captured_at(source_url, contents, color, Utc::now().timestamp_millis())
    }

    /// Create a quote with an explicit capture time
    pub fn captured_at(
        source_url: &str,
        contents: Vec<String>,
        color: Color,
        created_at: i64,
    ) -> Option<Self> {
        let contents: Vec<String> = contents
            .into_iter()
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        if contents.is_empty() {
            return None;
        }
        Some(Self {
            source_url: source_url.to_string(),
            contents,
            locators: None,
            comment: String::new(),
            color,
            created_at,
            note: None,
        })
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn with_locators(mut self, locators: Locators) -> Self {
        self.locators = Some(locators);
        self
    }

    /// Stable identity derived from URL, contents, color and capture time
    pub fn id(&self) -> QuoteId {
        let mut hasher = Sha256::new();
        hasher.update(normalize_url(&self.source_url).as_bytes());
        hasher.update([0u8]);
        hasher.update(self.contents.join("\u{1f}").as_bytes());
        hasher.update([0u8]);
        hasher.update(self.color.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.created_at.to_be_bytes());
        QuoteId(hex::encode(hasher.finalize()))
    }

    /// URL used for page matching
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.source_url)
    }

    /// Whether the quote lives in an external note store
    pub fn is_persisted(&self) -> bool {
        self.note.is_some()
    }

    /// Whether the quote carries a comment
    pub fn has_comment(&self) -> bool {
        !self.comment.trim().is_empty()
    }

    /// Render as Markdown for clipboard capture
    pub fn to_markdown(&self) -> String {
        let mut out = self
            .contents
            .iter()
            .map(|entry| {
                entry
                    .lines()
                    .map(|line| format!("> {}", line).trim_end().to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n>\n");

        if self.has_comment() {
            out.push_str("\n\n");
            out.push_str(self.comment.trim());
        }
        out.push_str(&format!("\n\n[source]({})", self.source_url));
        out
    }
}
