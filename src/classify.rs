//! Content classification predicates
//!
//! Decides, once per visited node, what role a node plays for capture and
//! matching: block separator, image, link, code span, invisible subtree or
//! plain inline content.

use crate::dom::{Document, NodeId, NodeKind};
use crate::markdown;

/// Elements that never produce a layout box
const INVISIBLE_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link",
];

/// Block-level elements that separate captured segments
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dialog", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody",
    "thead", "tfoot", "tr", "td", "th", "ul",
];

const BLOCK_DISPLAYS: &[&str] = &["block", "flex", "grid", "list-item", "table"];

/// Role of a node during a traversal step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentClass<'a> {
    /// Text node with its character data
    Text(&'a str),
    /// Element without a layout box; its subtree is skipped
    Invisible,
    /// Block-level element
    Block,
    /// Image element
    Image,
    /// Link with an absolute http(s) target and visible text
    Anchor { href: &'a str },
    /// Code span or block
    Code { fenced: bool },
    /// Any other element
    Inline,
    /// Comments and non-content nodes
    Ignored,
}

/// Classify a node
pub fn classify(doc: &Document, node: NodeId) -> ContentClass<'_> {
    match doc.kind(node) {
        NodeKind::Text(text) => ContentClass::Text(text),
        NodeKind::Comment(_) | NodeKind::Other => ContentClass::Ignored,
        NodeKind::Element(_) => {
            if is_invisible(doc, node) {
                ContentClass::Invisible
            } else if is_image(doc, node) {
                ContentClass::Image
            } else if let Some(href) = anchor_href(doc, node) {
                ContentClass::Anchor { href }
            } else if is_code(doc, node) {
                ContentClass::Code {
                    fenced: doc.ancestors(node).any(|a| is_preformatted_container(doc, a)),
                }
            } else if is_block(doc, node) {
                ContentClass::Block
            } else {
                ContentClass::Inline
            }
        }
    }
}

/// Parse an inline `style` attribute into lowercase `(property, value)` pairs
fn inline_style(doc: &Document, node: NodeId) -> Vec<(String, String)> {
    doc.attr(node, "style")
        .map(|style| {
            style
                .split(';')
                .filter_map(|decl| decl.split_once(':'))
                .map(|(prop, value)| {
                    let value = value.trim().trim_end_matches("!important").trim();
                    (prop.trim().to_ascii_lowercase(), value.to_ascii_lowercase())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn style_value(doc: &Document, node: NodeId, property: &str) -> Option<String> {
    inline_style(doc, node)
        .into_iter()
        .rev()
        .find(|(prop, _)| prop == property)
        .map(|(_, value)| value)
}

/// Whether an element has no layout box
pub fn is_invisible(doc: &Document, node: NodeId) -> bool {
    let Some(tag) = doc.tag_name(node) else {
        return false;
    };
    if INVISIBLE_TAGS.contains(&tag) || doc.attr(node, "hidden").is_some() {
        return true;
    }
    matches!(style_value(doc, node, "display").as_deref(), Some("none"))
        || matches!(
            style_value(doc, node, "visibility").as_deref(),
            Some("hidden") | Some("collapse")
        )
}

pub fn is_block(doc: &Document, node: NodeId) -> bool {
    let Some(tag) = doc.tag_name(node) else {
        return false;
    };
    if let Some(display) = style_value(doc, node, "display") {
        return BLOCK_DISPLAYS.contains(&display.as_str());
    }
    BLOCK_TAGS.contains(&tag)
}

pub fn is_image(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node) == Some("img")
}

pub fn is_code(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node) == Some("code")
}

/// `<pre>`, or an element styled with a preserving `white-space`
fn is_preformatted_container(doc: &Document, node: NodeId) -> bool {
    if doc.tag_name(node) == Some("pre") {
        return true;
    }
    style_value(doc, node, "white-space")
        .map(|ws| ws.starts_with("pre") || ws == "break-spaces")
        .unwrap_or(false)
}

/// Whether whitespace inside `node` is significant
pub fn is_preformatted(doc: &Document, node: NodeId) -> bool {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .any(|n| is_preformatted_container(doc, n))
}

/// Target of a link worth preserving in captured text
///
/// Only absolute http(s) links with non-blank text qualify.
pub fn anchor_href(doc: &Document, node: NodeId) -> Option<&str> {
    if doc.tag_name(node) != Some("a") {
        return None;
    }
    let href = doc.attr(node, "href")?.trim();
    let lower = href.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return None;
    }
    if doc.text_content(node).trim().is_empty() {
        return None;
    }
    Some(href)
}

/// Last child that can carry content (text or element)
pub fn last_eligible_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.children(node)
        .iter()
        .rev()
        .copied()
        .find(|&child| doc.is_text(child) || doc.is_element(child))
}

/// Matching token for an image: `![alt]`
///
/// The source is deliberately left out: lazily-loaded images swap their
/// `src` after capture, so only the alternate text identifies them.
pub fn image_token(doc: &Document, node: NodeId) -> String {
    format!("![{}]", doc.attr(node, "alt").unwrap_or_default())
}

/// Markdown image syntax `![alt](src "title")`
pub fn image_markdown(alt: &str, src: &str, title: &str) -> String {
    let mut out = format!("![{}]({}", markdown::escape_text(alt), markdown::destination(src));
    if !title.is_empty() {
        out.push(' ');
        out.push_str(&markdown::title(title));
    }
    out.push(')');
    out
}
