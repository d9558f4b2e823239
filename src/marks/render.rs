//! Highlight wrapper rendering

use serde::Deserialize;

use super::MarkId;
use crate::quote::Quote;

/// Configuration for highlight wrappers
#[derive(Debug, Clone, Deserialize)]
pub struct MarkConfig {
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute carrying the quote identity
    pub id_attribute: String,
    /// Data attribute carrying the mark identity
    pub mark_attribute: String,
    /// Whether to paint the color with an inline style
    pub include_inline_styles: bool,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self {
            class_prefix: "quote-highlight".to_string(),
            id_attribute: "data-quote-id".to_string(),
            mark_attribute: "data-mark-id".to_string(),
            include_inline_styles: true,
        }
    }
}

/// Wrapper element tag
pub const MARK_TAG: &str = "mark";

/// Attributes of a wrapper element for `quote`
pub fn mark_attributes(quote: &Quote, id: MarkId, config: &MarkConfig) -> Vec<(String, String)> {
    let mut attrs = vec![
        (
            "class".to_string(),
            format!(
                "{} {}-{}",
                config.class_prefix, config.class_prefix, quote.color
            ),
        ),
        (config.id_attribute.clone(), quote.id().to_string()),
        (config.mark_attribute.clone(), id.to_string()),
    ];
    if config.include_inline_styles {
        attrs.push((
            "style".to_string(),
            format!("background-color: {};", quote.color.css_value()),
        ));
    }
    if quote.has_comment() {
        attrs.push(("title".to_string(), quote.comment.trim().to_string()));
    }
    attrs
}
