//! Configuration bundle for one render.

use std::sync::Arc;

use statedsl_model::RenderOptions;

use crate::embedded::FunctionCatalog;

/// Default originating environment.
pub const DEFAULT_ENV: &str = "base";

/// Everything a render needs besides the script itself.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Document id being rendered (e.g. `web.nginx`).
    pub sls: String,
    /// Originating environment/namespace.
    pub env: String,
    /// Initial option values; a script may still configure them once.
    pub options: RenderOptions,
    /// Callables that embedded calls may reference by name.
    pub catalog: Arc<FunctionCatalog>,
}

impl RenderContext {
    pub fn new(sls: impl Into<String>) -> Self {
        Self {
            sls: sls.into(),
            env: DEFAULT_ENV.to_string(),
            options: RenderOptions::default(),
            catalog: Arc::new(FunctionCatalog::default()),
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Start the render with ordered mode on.
    #[must_use]
    pub fn ordered(mut self, ordered: bool) -> Self {
        self.options.ordered = ordered;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<FunctionCatalog>) -> Self {
        self.catalog = catalog;
        self
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new("")
    }
}
