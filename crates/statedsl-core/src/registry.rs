//! The declaration registry of one render.
//!
//! The [`Registry`] owns every state declared by a script, in first-reference
//! order, plus the side channels the output needs:
//!
//! - the ordering log (first action of each node while ordered mode is on)
//! - the `extend` bucket and the `include` list
//! - the embedded calls recorded by `node.call(...)`
//! - a synthetic-id counter for anonymous states and call wrappers
//!
//! One registry serves exactly one render. It is consumed by
//! [`Registry::finalize`], so it can never leak state into another render.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use statedsl_model::{
    ModuleName, ORDERED_OPTION, RenderOptions, RequisiteKind, StateDecl, StateId, Target,
};
use tracing::{debug, trace};

use crate::args::Args;
use crate::context::RenderContext;
use crate::embedded::{Callable, EmbeddedCall};
use crate::error::{RenderError, Result};
use crate::handle::StateHandle;
use crate::node::{NodeKey, StateFunctionNode};

/// Prefix of generated ids for `state()` without an id.
pub const ANONYMOUS_PREFIX: &str = ".anon-";

/// All nodes declared under one state id, in first-reference order.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateEntry {
    pub(crate) nodes: Vec<StateFunctionNode>,
}

impl StateEntry {
    fn node_mut(&mut self, key: &NodeKey) -> &mut StateFunctionNode {
        let index = match self.nodes.iter().position(|node| node.key() == key) {
            Some(index) => index,
            None => {
                self.nodes.push(StateFunctionNode::new(key.clone()));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[index]
    }

    /// Declarative form without the missing-action check (used by `extend`).
    pub(crate) fn to_decl(&self) -> StateDecl {
        let mut decl = StateDecl::new();
        for node in &self.nodes {
            decl.insert(node.key().module.clone(), node.to_decl());
        }
        decl
    }
}

pub struct Registry {
    pub(crate) context: RenderContext,
    pub(crate) options: RenderOptions,
    configured: BTreeSet<String>,
    pub(crate) states: BTreeMap<StateId, StateEntry>,
    pub(crate) order: Vec<StateId>,
    pub(crate) action_log: Vec<NodeKey>,
    pub(crate) extends: Vec<(StateId, StateDecl)>,
    pub(crate) includes: Vec<String>,
    pub(crate) calls: BTreeMap<String, EmbeddedCall>,
    next_synthetic: usize,
}

impl Registry {
    pub fn new(context: RenderContext) -> Self {
        let options = context.options;
        Self {
            context,
            options,
            configured: BTreeSet::new(),
            states: BTreeMap::new(),
            order: Vec::new(),
            action_log: Vec::new(),
            extends: Vec::new(),
            includes: Vec::new(),
            calls: BTreeMap::new(),
            next_synthetic: 0,
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Return the handle for `id`, registering the id on first reference.
    ///
    /// `None` (or a blank id) declares an anonymous state with a generated id
    /// that is unique for the rest of the render.
    pub fn state(&mut self, id: Option<&str>) -> Result<StateHandle<'_>> {
        let id = match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => StateId::new(id)?,
            None => self.anonymous_id()?,
        };
        self.entry_mut(&id);
        Ok(StateHandle::new(self, id))
    }

    /// State ids of the main output, in first-reference order.
    pub fn state_ids(&self) -> impl Iterator<Item = &StateId> {
        self.order.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&StateFunctionNode> {
        self.states
            .get(&key.state_id)?
            .nodes
            .iter()
            .find(|node| node.key() == key)
    }

    /// Look up a callable in the render's function catalog.
    pub fn callable(&self, name: &str) -> Result<Callable> {
        self.context
            .catalog
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::UnknownCallable {
                name: name.to_string(),
            })
    }

    /// Apply one configuration call.
    ///
    /// Only `ordered` (bool) is recognized. Each option may be configured
    /// once; repeating the same value is accepted.
    pub fn set_option(&mut self, name: &str, value: &Value) -> Result<()> {
        if name != ORDERED_OPTION {
            return Err(RenderError::UnknownOption {
                name: name.to_string(),
            });
        }
        let Value::Bool(ordered) = value else {
            return Err(RenderError::InvalidOption {
                name: name.to_string(),
                message: format!("expected a bool, found {value}"),
            });
        };
        if self.configured.contains(name) && self.options.ordered != *ordered {
            return Err(RenderError::OptionsLocked {
                name: name.to_string(),
            });
        }
        self.configured.insert(name.to_string());
        self.options.ordered = *ordered;
        debug!(ordered, "render option configured");
        Ok(())
    }

    pub(crate) fn next_synthetic(&mut self) -> usize {
        let n = self.next_synthetic;
        self.next_synthetic += 1;
        n
    }

    fn anonymous_id(&mut self) -> Result<StateId> {
        loop {
            let candidate = format!("{ANONYMOUS_PREFIX}{}", self.next_synthetic());
            let taken = self.states.contains_key(candidate.as_str())
                || self.extends.iter().any(|(id, _)| id.as_str() == candidate);
            if !taken {
                return Ok(StateId::new(candidate)?);
            }
        }
    }

    pub(crate) fn entry_mut(&mut self, id: &StateId) -> &mut StateEntry {
        if !self.states.contains_key(id) {
            trace!(state_id = %id, "registering state");
            self.order.push(id.clone());
        }
        self.states.entry(id.clone()).or_default()
    }

    /// Get or create the node, re-registering its state id if an `extend`
    /// moved it out of the main output.
    pub(crate) fn node_mut(&mut self, key: &NodeKey) -> &mut StateFunctionNode {
        self.entry_mut(&key.state_id).node_mut(key)
    }

    pub(crate) fn ensure_node(&mut self, key: &NodeKey) {
        self.node_mut(key);
    }

    /// Record an action call on a node.
    ///
    /// A verb is set once; repeating it appends arguments. The first
    /// positional argument becomes the `name` entry, keywords follow in order.
    pub(crate) fn declare_action(
        &mut self,
        key: &NodeKey,
        verb: Option<&str>,
        args: Args,
    ) -> Result<()> {
        let (positional, named) = args.into_parts();
        if positional.len() > 1 {
            return Err(RenderError::InvalidArguments {
                state_id: key.state_id.to_string(),
                module: key.module.to_string(),
                message: format!(
                    "expected at most one positional argument, found {}",
                    positional.len()
                ),
            });
        }
        let ordered = self.options.ordered;
        let node = self.node_mut(key);
        let first = match verb {
            Some(verb) => node.set_function(verb)?,
            None => false,
        };
        if let Some(name) = positional.into_iter().next() {
            node.push_arg("name", name);
        }
        for (name, value) in named {
            node.push_arg(name, value);
        }
        debug!(
            state_id = %key.state_id,
            module = %key.module,
            verb = verb.unwrap_or_default(),
            first,
            "declared action"
        );
        if first && ordered {
            self.action_log.push(key.clone());
        }
        Ok(())
    }

    pub(crate) fn add_requisite(&mut self, key: &NodeKey, kind: RequisiteKind, target: Target) {
        trace!(
            state_id = %key.state_id,
            module = %key.module,
            kind = %kind,
            target = %target,
            "declared requisite"
        );
        self.node_mut(key).add_requisite(kind, target);
    }

    /// Record an embedded call and the `call` action that points at it. A node
    /// holds at most one embedded call.
    pub(crate) fn declare_call(
        &mut self,
        key: &NodeKey,
        callable: Callable,
        args: Args,
    ) -> Result<String> {
        if self.node(key).and_then(StateFunctionNode::function) == Some("call") {
            return Err(RenderError::InvalidArguments {
                state_id: key.state_id.to_string(),
                module: key.module.to_string(),
                message: "an embedded call is already declared on this node".to_string(),
            });
        }
        let id = format!(
            "{}::{}#{}",
            key.state_id,
            callable.name(),
            self.next_synthetic()
        );
        let (positional, named) = args.into_parts();
        let kwargs: serde_json::Map<String, Value> = named.into_iter().collect();
        let action = Args::new()
            .arg(callable.name())
            .kw("func", id.as_str())
            .kw("args", Value::Array(positional.clone()))
            .kw("kws", Value::Object(kwargs.clone()));
        self.declare_action(key, Some("call"), action)?;
        debug!(state_id = %key.state_id, id = %id, "embedded call recorded");
        self.calls.insert(
            id.clone(),
            EmbeddedCall {
                id: id.clone(),
                state_id: key.state_id.to_string(),
                callable,
                args: positional,
                kwargs,
            },
        );
        Ok(id)
    }

    pub(crate) fn module_key(&self, id: &StateId, module: &str) -> Result<NodeKey> {
        Ok(NodeKey::new(id.clone(), ModuleName::new(module)?))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sls", &self.context.sls)
            .field("options", &self.options)
            .field("states", &self.order)
            .field("includes", &self.includes)
            .field("extends", &self.extends.len())
            .field("calls", &self.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anonymous_ids_skip_taken_ids() {
        let mut registry = Registry::new(RenderContext::new("test"));
        registry.state(Some(".anon-0")).expect("explicit");
        let id = registry.state(None).expect("anonymous").id().clone();
        assert_eq!(id.as_str(), ".anon-1");
        let blank = registry.state(Some("  ")).expect("blank").id().clone();
        assert_eq!(blank.as_str(), ".anon-2");
    }

    #[test]
    fn ordered_option_is_configured_once() {
        let mut registry = Registry::new(RenderContext::new("test"));
        registry
            .set_option(ORDERED_OPTION, &json!(true))
            .expect("set");
        registry
            .set_option(ORDERED_OPTION, &json!(true))
            .expect("same value");
        assert!(matches!(
            registry.set_option(ORDERED_OPTION, &json!(false)),
            Err(RenderError::OptionsLocked { .. })
        ));
        assert!(matches!(
            registry.set_option("fast", &json!(true)),
            Err(RenderError::UnknownOption { .. })
        ));
        assert!(matches!(
            Registry::new(RenderContext::new("test")).set_option(ORDERED_OPTION, &json!("yes")),
            Err(RenderError::InvalidOption { .. })
        ));
    }

    #[test]
    fn first_action_is_logged_only_in_ordered_mode() {
        let mut registry = Registry::new(RenderContext::new("test"));
        registry
            .state(Some("A"))
            .and_then(|s| s.module("cmd"))
            .and_then(|n| n.function("run", Args::new().arg("echo a")))
            .expect("declare");
        assert!(registry.action_log.is_empty());

        registry
            .set_option(ORDERED_OPTION, &json!(true))
            .expect("set");
        registry
            .state(Some("B"))
            .and_then(|s| s.module("cmd"))
            .and_then(|n| n.function("run", Args::new().arg("echo b")))
            .and_then(|n| n.function("run", Args::new().kw("cwd", "/")))
            .expect("declare");
        assert_eq!(registry.action_log.len(), 1);
        assert_eq!(registry.action_log[0].state_id.as_str(), "B");
    }
}
