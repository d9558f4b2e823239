//! Highlight marks
//!
//! A mark is the render-time binding between one quote and the wrapper
//! elements painting it. Marks are never persisted; they are rebuilt from
//! stored quotes on every page load.

mod registry;
mod render;

pub use registry::{Mark, MarkRegistry};
pub use render::{mark_attributes, MarkConfig, MARK_TAG};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a live mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkId(Uuid);

impl MarkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
