//! One `(state id, module)` pair and everything declared on it.

use std::fmt;

use serde_json::Value;
use statedsl_model::{
    DeclArg, ModuleDecl, ModuleName, RequisiteKind, StateId, Target, encode_targets,
};

use crate::error::{RenderError, Result};

/// Identity of a state-function node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub state_id: StateId,
    pub module: ModuleName,
}

impl NodeKey {
    pub fn new(state_id: StateId, module: ModuleName) -> Self {
        Self { state_id, module }
    }

    /// The requisite target naming this node.
    pub fn target(&self) -> Target {
        Target {
            module: self.module.clone(),
            state_id: self.state_id.clone(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.state_id, self.module)
    }
}

/// An entry of the declarative list in call order.
///
/// Requisites of one kind share a single slot, created where that kind first
/// appeared.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Arg(DeclArg),
    Requisites(RequisiteKind, Vec<Target>),
}

/// The accumulated action and requisites of one `(state id, module)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFunctionNode {
    key: NodeKey,
    function: Option<String>,
    slots: Vec<Slot>,
    ordered_after: Option<Target>,
}

impl StateFunctionNode {
    pub fn new(key: NodeKey) -> Self {
        Self {
            key,
            function: None,
            slots: Vec::new(),
            ordered_after: None,
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn has_function(&self) -> bool {
        self.function.is_some()
    }

    /// Record the verb. Returns `true` when this is the node's first action.
    ///
    /// Repeating the recorded verb is legal; a different verb is not.
    pub(crate) fn set_function(&mut self, verb: &str) -> Result<bool> {
        match &self.function {
            None => {
                self.function = Some(verb.to_string());
                Ok(true)
            }
            Some(existing) if existing == verb => Ok(false),
            Some(existing) => Err(RenderError::DuplicateAction {
                state_id: self.key.state_id.to_string(),
                module: self.key.module.to_string(),
                existing: existing.clone(),
                requested: verb.to_string(),
            }),
        }
    }

    pub(crate) fn push_arg(&mut self, key: impl Into<String>, value: Value) {
        self.slots.push(Slot::Arg(DeclArg::new(key, value)));
    }

    pub(crate) fn add_requisite(&mut self, kind: RequisiteKind, target: Target) {
        for slot in &mut self.slots {
            if let Slot::Requisites(existing, targets) = slot {
                if *existing == kind {
                    targets.push(target);
                    return;
                }
            }
        }
        self.slots.push(Slot::Requisites(kind, vec![target]));
    }

    pub(crate) fn set_ordered_after(&mut self, target: Target) {
        self.ordered_after = Some(target);
    }

    /// The `require` injected by ordered mode, if any.
    pub fn ordered_after(&self) -> Option<&Target> {
        self.ordered_after.as_ref()
    }

    /// Operator-declared targets of one kind, in call order.
    pub fn requisites(&self, kind: RequisiteKind) -> impl Iterator<Item = &Target> {
        self.slots.iter().flat_map(move |slot| match slot {
            Slot::Requisites(existing, targets) if *existing == kind => targets.as_slice(),
            _ => &[][..],
        })
    }

    /// True when nothing has been declared on the node yet.
    pub fn is_empty(&self) -> bool {
        self.function.is_none() && self.slots.is_empty()
    }

    /// The declarative form of this node.
    ///
    /// The injected ordering requisite leads the `require` list; without an
    /// operator-declared `require` it is placed right after the verb.
    pub fn to_decl(&self) -> ModuleDecl {
        let mut args = Vec::with_capacity(self.slots.len() + 1);
        let mut injected = self.ordered_after.as_ref();
        for slot in &self.slots {
            match slot {
                Slot::Arg(arg) => args.push(arg.clone()),
                Slot::Requisites(kind, targets) => {
                    let value = match injected.filter(|_| *kind == RequisiteKind::Require) {
                        Some(first) => {
                            injected = None;
                            encode_targets(std::iter::once(first).chain(targets))
                        }
                        None => encode_targets(targets),
                    };
                    args.push(DeclArg::new(kind.as_str(), value));
                }
            }
        }
        if let Some(first) = injected {
            args.insert(
                0,
                DeclArg::new(
                    RequisiteKind::Require.as_str(),
                    encode_targets(std::iter::once(first)),
                ),
            );
        }
        ModuleDecl {
            function: self.function.clone(),
            args,
        }
    }
}
