//! Range construction from resolved boundaries

use crate::dom::{Boundary, Range};

/// Combines resolved boundaries into a range
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeBuilder {
    start: Option<Boundary>,
    end: Option<Boundary>,
}

impl RangeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_start(mut self, start: Boundary) -> Self {
        self.start = Some(start);
        self
    }

    pub fn set_end(mut self, end: Boundary) -> Self {
        self.end = Some(end);
        self
    }

    /// The range, or `None` when either boundary is missing
    pub fn build(self) -> Option<Range> {
        Some(Range::new(self.start?, self.end?))
    }
}
