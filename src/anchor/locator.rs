//! Selector-based locators
//!
//! A locator is a unique CSS selector for a block container, base64 encoded
//! for storage. Selectors use the restricted grammar produced here: an
//! optional `#id` anchor followed by `tag:nth-child(n)` steps joined with
//! ` > `, or a path rooted at `html`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify;
use crate::dom::{Document, NodeId, TreeWalker};
use crate::error::LocatorError;

/// How stored quotes are re-found on the page
///
/// Fixed per deployment; stored data is not portable between strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorStrategy {
    /// Match `contents` against the whole page text
    #[default]
    Text,
    /// Match `contents` inside the containers named by stored selectors
    Selector,
}

impl FromStr for LocatorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "selector" => Ok(Self::Selector),
            other => Err(format!("unknown locator strategy: {}", other)),
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Selector => f.write_str("selector"),
        }
    }
}

fn step_syntax() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z][a-z0-9-]*):nth-child\((\d+)\)$").expect("valid step regex"))
}

fn id_syntax() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid id regex"))
}

/// Nearest block-level container of a node (the node itself when it is one)
///
/// Falls back to the outermost element below the root.
pub fn block_container(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut fallback = None;
    for candidate in std::iter::once(node).chain(doc.ancestors(node)) {
        if !doc.is_element(candidate) {
            continue;
        }
        if classify::is_block(doc, candidate) || doc.tag_name(candidate) == Some("body") {
            return Some(candidate);
        }
        fallback = Some(candidate);
    }
    fallback
}

/// Encode the block container of `node` as an opaque locator
pub fn encode(doc: &Document, node: NodeId) -> Result<String, LocatorError> {
    let container = block_container(doc, node).ok_or(LocatorError::NoElement)?;
    let selector = unique_selector(doc, container).ok_or(LocatorError::NoElement)?;
    Ok(URL_SAFE.encode(selector.as_bytes()))
}

/// Decode a locator and find the element it names
pub fn decode(doc: &Document, locator: &str) -> Result<NodeId, LocatorError> {
    let bytes = URL_SAFE.decode(locator.trim())?;
    let selector = String::from_utf8(bytes)?;
    query_selector(doc, &selector)
}

fn usable_id(doc: &Document, element: NodeId) -> Option<&str> {
    let id = doc.attr(element, "id")?;
    if !id_syntax().is_match(id) {
        return None;
    }
    let holders = TreeWalker::new(doc, doc.root())
        .filter(|&n| doc.attr(n, "id") == Some(id))
        .take(2)
        .count();
    (holders == 1).then_some(id)
}

/// Unique selector for a connected element
pub fn unique_selector(doc: &Document, element: NodeId) -> Option<String> {
    if !doc.is_element(element) || !doc.is_connected(element) {
        return None;
    }

    let mut steps = Vec::new();
    let mut current = element;
    loop {
        if let Some(id) = usable_id(doc, current) {
            steps.push(format!("#{}", id));
            break;
        }
        let tag = doc.tag_name(current)?;
        let parent = doc.parent(current)?;
        if parent == doc.root() {
            steps.push(tag.to_string());
            break;
        }
        let position = doc
            .children(parent)
            .iter()
            .filter(|&&sibling| doc.is_element(sibling))
            .position(|&sibling| sibling == current)?;
        steps.push(format!("{}:nth-child({})", tag, position + 1));
        current = parent;
    }

    steps.reverse();
    Some(steps.join(" > "))
}

/// Find the element named by a selector produced by [`unique_selector`]
pub fn query_selector(doc: &Document, selector: &str) -> Result<NodeId, LocatorError> {
    let not_found = || LocatorError::NotFound(selector.to_string());
    let mut steps = selector.split('>').map(str::trim);

    let head = steps
        .next()
        .filter(|head| !head.is_empty())
        .ok_or_else(|| LocatorError::InvalidSelector(selector.to_string()))?;
    let mut current = if let Some(id) = head.strip_prefix('#') {
        TreeWalker::new(doc, doc.root())
            .find(|&n| doc.attr(n, "id") == Some(id))
            .ok_or_else(not_found)?
    } else {
        doc.children(doc.root())
            .iter()
            .copied()
            .find(|&n| doc.tag_name(n) == Some(head))
            .ok_or_else(not_found)?
    };

    for step in steps {
        let caps = step_syntax()
            .captures(step)
            .ok_or_else(|| LocatorError::InvalidSelector(selector.to_string()))?;
        let tag = &caps[1];
        let nth: usize = caps[2]
            .parse()
            .map_err(|_| LocatorError::InvalidSelector(selector.to_string()))?;
        let child = doc
            .children(current)
            .iter()
            .copied()
            .filter(|&n| doc.is_element(n))
            .nth(nth.saturating_sub(1))
            .filter(|&n| doc.tag_name(n) == Some(tag))
            .ok_or_else(not_found)?;
        current = child;
    }
    Ok(current)
}
