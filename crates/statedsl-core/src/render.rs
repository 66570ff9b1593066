//! Output assembly.

use std::collections::BTreeMap;

use statedsl_model::{HighState, StateDecl};
use tracing::{debug, info, info_span};

use crate::context::RenderContext;
use crate::embedded::EmbeddedCall;
use crate::error::{RenderError, Result};
use crate::registry::Registry;

/// The result of one render.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    /// The declarative document handed to the execution engine.
    pub high: HighState,
    /// Callables recorded by embedded calls, keyed by wrapper id.
    pub calls: BTreeMap<String, EmbeddedCall>,
}

impl Rendered {
    pub fn call(&self, id: &str) -> Option<&EmbeddedCall> {
        self.calls.get(id)
    }
}

impl Registry {
    /// Finish the render and assemble the output document.
    ///
    /// Fails with [`RenderError::MissingAction`] if a node of the main output
    /// has arguments or requisites but no verb. Nodes that were only accessed
    /// are left out; a state without modules is emitted as an empty mapping.
    pub fn finalize(mut self) -> Result<Rendered> {
        let span = info_span!("render", sls = %self.context.sls, env = %self.context.env);
        let _guard = span.enter();

        self.apply_ordering();

        let mut high = HighState::new();
        high.include = std::mem::take(&mut self.includes);
        high.extend = std::mem::take(&mut self.extends);
        for id in std::mem::take(&mut self.order) {
            let Some(entry) = self.states.remove(&id) else {
                continue;
            };
            let mut decl = StateDecl::new();
            for node in entry.nodes.iter().filter(|node| !node.is_empty()) {
                if !node.has_function() {
                    return Err(RenderError::MissingAction {
                        state_id: id.to_string(),
                        module: node.key().module.to_string(),
                    });
                }
                decl.insert(node.key().module.clone(), node.to_decl());
            }
            debug!(state_id = %id, modules = decl.len(), "state finalized");
            high.states.push((id, decl));
        }

        info!(
            states = high.states.len(),
            include = high.include.len(),
            extend = high.extend.len(),
            calls = self.calls.len(),
            "render finished"
        );
        Ok(Rendered {
            high,
            calls: self.calls,
        })
    }

    /// Run `script` against a fresh registry and finalize it.
    pub fn render<F>(context: RenderContext, script: F) -> Result<Rendered>
    where
        F: FnOnce(&mut Registry) -> Result<()>,
    {
        let mut registry = Registry::new(context);
        script(&mut registry)?;
        registry.finalize()
    }
}
