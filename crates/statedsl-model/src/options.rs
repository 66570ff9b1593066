//! Render options that a script may configure.

use serde::{Deserialize, Serialize};

/// Name of the option that turns on automatic ordering.
pub const ORDERED_OPTION: &str = "ordered";

/// Options controlling how a render post-processes its declarations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Inject a `require` on each newly declared action pointing at the
    /// previously declared one, so states run in script order.
    pub ordered: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    /// Names accepted by a script configuration call.
    pub fn recognized() -> &'static [&'static str] {
        &[ORDERED_OPTION]
    }
}
