//! Call arguments and their classification into actions or requisites.

use serde_json::Value;
use statedsl_model::{ModelError, RequisiteKind, Target};

/// Positional and keyword arguments of one call on a node.
///
/// Keyword order is preserved; it becomes the order of the `{key: value}`
/// entries in the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(positional: Vec<Value>, named: Vec<(String, Value)>) -> Self {
        Self { positional, named }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument.
    #[must_use]
    pub fn kw(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.push((key.into(), value.into()));
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Value>, Vec<(String, Value)>) {
        (self.positional, self.named)
    }
}

/// A classified call on a state-function node.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// The verb named a requisite kind; each target becomes one entry.
    Requisite {
        kind: RequisiteKind,
        targets: Vec<Target>,
    },
    /// Anything else declares (or extends) the node's action.
    Action { verb: Option<String>, args: Args },
}

impl Invocation {
    /// Classify a call by its verb.
    ///
    /// Requisite targets come from positional `{module: state_id}` references
    /// first, then from `module=state_id` keyword pairs in keyword order.
    pub fn classify(verb: Option<&str>, args: Args) -> Result<Self, ModelError> {
        let Some(kind) = verb.and_then(RequisiteKind::from_name) else {
            return Ok(Invocation::Action {
                verb: verb.map(str::to_string),
                args,
            });
        };
        let (positional, named) = args.into_parts();
        let mut targets = Vec::with_capacity(positional.len() + named.len());
        for value in &positional {
            targets.push(Target::from_value(value)?);
        }
        for (module, state_id) in &named {
            targets.push(Target::from_pair(module, state_id)?);
        }
        if targets.is_empty() {
            return Err(ModelError::InvalidTarget(format!("{kind} without a target")));
        }
        Ok(Invocation::Requisite { kind, targets })
    }
}
