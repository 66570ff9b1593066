//! Cross-document composition: `include`, `extend` and bulk merge of
//! already-declarative documents.

use statedsl_model::{HighState, ModuleDecl, StateDecl, StateId};
use tracing::{debug, info};

use crate::error::{RenderError, Result};
use crate::node::NodeKey;
use crate::registry::Registry;

impl Registry {
    /// Append document references to the output's `include` list, verbatim.
    pub fn include<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            debug!(include = %name, "include");
            self.includes.push(name);
        }
    }

    /// Move states into the `extend` bucket.
    ///
    /// Each id leaves the main output; its current declarations are merged
    /// into the bucket entry for that id. Extending an id that is already in
    /// the bucket (and was not referenced again since) is a no-op.
    pub fn extend<'a, I>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a StateId>,
    {
        for id in ids {
            if self.options.ordered {
                return Err(RenderError::ExtendAfterOrdered {
                    state_id: id.to_string(),
                });
            }
            match self.states.remove(id) {
                Some(entry) => {
                    self.order.retain(|existing| existing != id);
                    self.action_log.retain(|key| key.state_id != *id);
                    debug!(state_id = %id, modules = entry.nodes.len(), "extend");
                    self.merge_extend(id.clone(), entry.to_decl());
                }
                None if self.extends.iter().any(|(existing, _)| existing == id) => {}
                None => {
                    return Err(RenderError::UnknownState {
                        state_id: id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn merge_extend(&mut self, id: StateId, decl: StateDecl) {
        match self.extends.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, existing)) => {
                for (module, module_decl) in decl.iter() {
                    existing.insert(module.clone(), module_decl.clone());
                }
            }
            None => self.extends.push((id, decl)),
        }
    }

    /// Merge an already-declarative document into this render.
    ///
    /// Declarations go straight onto the nodes without being reclassified:
    /// named entries (requisite keys included) are appended as they are. A
    /// module that already has a different verb raises
    /// [`RenderError::DuplicateAction`].
    pub fn load_highstate(&mut self, high: &HighState) -> Result<()> {
        info!(
            states = high.states.len(),
            include = high.include.len(),
            extend = high.extend.len(),
            "merging declarative document"
        );
        self.include(high.include.iter().cloned());
        for (id, decl) in &high.extend {
            self.merge_extend(id.clone(), decl.clone());
        }
        for (id, decl) in &high.states {
            self.entry_mut(id);
            for (module, module_decl) in decl.iter() {
                let key = NodeKey::new(id.clone(), module.clone());
                self.merge_module(&key, module_decl)?;
            }
        }
        Ok(())
    }

    fn merge_module(&mut self, key: &NodeKey, decl: &ModuleDecl) -> Result<()> {
        let ordered = self.options.ordered;
        let node = self.node_mut(key);
        let first = match decl.function.as_deref() {
            Some(verb) => node.set_function(verb)?,
            None => false,
        };
        for arg in &decl.args {
            node.push_arg(arg.key.clone(), arg.value.clone());
        }
        if first && ordered {
            self.action_log.push(key.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use crate::context::RenderContext;
    use serde_json::json;
    use statedsl_model::ORDERED_OPTION;

    fn registry() -> Registry {
        Registry::new(RenderContext::new("test"))
    }

    #[test]
    fn extend_requires_a_known_state() {
        let mut registry = registry();
        let id = StateId::new("ghost").expect("id");
        assert!(matches!(
            registry.extend([&id]),
            Err(RenderError::UnknownState { .. })
        ));
    }

    #[test]
    fn extend_twice_is_a_no_op() {
        let mut registry = registry();
        let id = registry
            .state(Some("X"))
            .and_then(|s| s.module("cmd"))
            .and_then(|n| n.invoke(Some("require"), Args::new().kw("cmd", "Y")))
            .expect("declare")
            .state_id()
            .clone();
        registry.extend([&id]).expect("extend");
        registry.extend([&id]).expect("extend again");
        assert!(!registry.contains("X"));
        assert_eq!(registry.extends.len(), 1);
    }

    #[test]
    fn extend_is_rejected_in_ordered_mode() {
        let mut registry = registry();
        registry
            .set_option(ORDERED_OPTION, &json!(true))
            .expect("set");
        let id = registry.state(Some("X")).expect("state").id().clone();
        assert!(matches!(
            registry.extend([&id]),
            Err(RenderError::ExtendAfterOrdered { .. })
        ));
    }

    #[test]
    fn bulk_merge_appends_on_the_same_verb() {
        let mut registry = registry();
        registry
            .state(Some("A"))
            .and_then(|s| s.module("cmd"))
            .and_then(|n| n.function("run", Args::new().arg("ls")))
            .expect("declare");
        let high = HighState::from_value(&json!({
            "A": {"cmd.run": [{"cwd": "/"}]},
        }))
        .expect("document");
        registry.load_highstate(&high).expect("merge");

        let conflicting = HighState::from_value(&json!({"A": {"cmd": ["wait"]}})).expect("doc");
        assert!(matches!(
            registry.load_highstate(&conflicting),
            Err(RenderError::DuplicateAction { .. })
        ));
    }
}
