//! Fluent handles over the registry.
//!
//! `registry.state(Some("A"))?.module("cmd")?.function("run", args)?` is the
//! Rust spelling of `state('A').cmd.run(...)`. Handles borrow the registry
//! mutably, so every declaration lands in the same render.

use statedsl_model::{RequisiteKind, StateId, Target};

use crate::args::{Args, Invocation};
use crate::embedded::Callable;
use crate::error::{RenderError, Result};
use crate::node::{NodeKey, StateFunctionNode};
use crate::registry::Registry;

/// The entry point for one state id.
pub struct StateHandle<'r> {
    registry: &'r mut Registry,
    id: StateId,
}

impl<'r> StateHandle<'r> {
    pub(crate) fn new(registry: &'r mut Registry, id: StateId) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> &StateId {
        &self.id
    }

    /// Return the node for `module`, creating it on first access.
    pub fn module(mut self, module: &str) -> Result<NodeMut<'r>> {
        let key = self.registry.module_key(&self.id, module)?;
        self.registry.ensure_node(&key);
        Ok(NodeMut {
            registry: self.registry,
            key,
        })
    }

    /// Declare an action directly on the state: `state(id)(module, verb, ...)`.
    pub fn declare(self, module: &str, verb: &str, args: Args) -> Result<NodeMut<'r>> {
        self.module(module)?.invoke(Some(verb), args)
    }
}

/// A mutable view of one state-function node.
///
/// Every call returns the node again, so declarations chain.
pub struct NodeMut<'r> {
    registry: &'r mut Registry,
    key: NodeKey,
}

impl<'r> NodeMut<'r> {
    pub(crate) fn new(registry: &'r mut Registry, key: NodeKey) -> Self {
        registry.ensure_node(&key);
        Self { registry, key }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn state_id(&self) -> &StateId {
        &self.key.state_id
    }

    pub fn module(&self) -> &str {
        self.key.module.as_str()
    }

    /// The `{module: state_id}` reference other nodes use to point here.
    pub fn target(&self) -> Target {
        self.key.target()
    }

    pub fn node(&self) -> Option<&StateFunctionNode> {
        self.registry.node(&self.key)
    }

    /// Generic dispatch: requisite kinds declare requisites, any other verb
    /// (or no verb) declares the action.
    pub fn invoke(mut self, verb: Option<&str>, args: Args) -> Result<Self> {
        let invocation =
            Invocation::classify(verb, args).map_err(|err| RenderError::InvalidRequisite {
                state_id: self.key.state_id.to_string(),
                module: self.key.module.to_string(),
                message: err.to_string(),
            })?;
        match invocation {
            Invocation::Requisite { kind, targets } => {
                for target in targets {
                    self.registry.add_requisite(&self.key, kind, target);
                }
            }
            Invocation::Action { verb, args } => {
                self.registry
                    .declare_action(&self.key, verb.as_deref(), args)?;
            }
        }
        Ok(self)
    }

    /// Attribute-style action call: `node.run(...)`.
    pub fn function(self, verb: &str, args: Args) -> Result<Self> {
        self.invoke(Some(verb), args)
    }

    pub fn requisite(mut self, kind: RequisiteKind, target: Target) -> Result<Self> {
        self.registry.add_requisite(&self.key, kind, target);
        Ok(self)
    }

    pub fn require(self, target: Target) -> Result<Self> {
        self.requisite(RequisiteKind::Require, target)
    }

    pub fn require_in(self, target: Target) -> Result<Self> {
        self.requisite(RequisiteKind::RequireIn, target)
    }

    pub fn watch(self, target: Target) -> Result<Self> {
        self.requisite(RequisiteKind::Watch, target)
    }

    pub fn watch_in(self, target: Target) -> Result<Self> {
        self.requisite(RequisiteKind::WatchIn, target)
    }

    pub fn use_(self, target: Target) -> Result<Self> {
        self.requisite(RequisiteKind::Use, target)
    }

    pub fn use_in(self, target: Target) -> Result<Self> {
        self.requisite(RequisiteKind::UseIn, target)
    }

    /// Embed `callable` as this node's action. The callable is not run here;
    /// see [`crate::EmbeddedCall`].
    pub fn call(mut self, callable: Callable, args: Args) -> Result<Self> {
        self.registry.declare_call(&self.key, callable, args)?;
        Ok(self)
    }

    /// Like [`NodeMut::call`], resolving the callable in the render's
    /// function catalog.
    pub fn call_named(self, name: &str, args: Args) -> Result<Self> {
        let callable = self.registry.callable(name)?;
        self.call(callable, args)
    }
}

impl Registry {
    /// Reopen a node by key, e.g. one remembered from an earlier handle.
    pub fn node_handle(&mut self, key: NodeKey) -> NodeMut<'_> {
        NodeMut::new(self, key)
    }
}
