//! Requisite kinds and their encoding in the declarative output.
//!
//! A requisite links one `(state id, module)` pair to another. In the output
//! every kind becomes a named argument whose value is an ordered list of
//! `{module: state_id}` singleton mappings:
//!
//! ```yaml
//! - require:
//!   - cmd: X
//!   - pkg: nginx
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::{ModelError, ModuleName, StateId};

/// The closed set of relationship kinds understood by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequisiteKind {
    Require,
    RequireIn,
    Watch,
    WatchIn,
    Use,
    UseIn,
}

impl RequisiteKind {
    pub const ALL: [RequisiteKind; 6] = [
        RequisiteKind::Require,
        RequisiteKind::RequireIn,
        RequisiteKind::Watch,
        RequisiteKind::WatchIn,
        RequisiteKind::Use,
        RequisiteKind::UseIn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequisiteKind::Require => "require",
            RequisiteKind::RequireIn => "require_in",
            RequisiteKind::Watch => "watch",
            RequisiteKind::WatchIn => "watch_in",
            RequisiteKind::Use => "use",
            RequisiteKind::UseIn => "use_in",
        }
    }

    /// Look up a kind by its output key. Returns `None` for action verbs.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for RequisiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequisiteKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ModelError::UnknownRequisite(s.to_string()))
    }
}

/// The `(module, state id)` pair a requisite points at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target {
    pub module: ModuleName,
    pub state_id: StateId,
}

impl Target {
    pub fn new(module: impl Into<String>, state_id: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            module: ModuleName::new(module)?,
            state_id: StateId::new(state_id)?,
        })
    }

    /// Build a target from a `module=state_id` keyword pair.
    pub fn from_pair(module: &str, state_id: &Value) -> Result<Self, ModelError> {
        let id = scalar_to_string(state_id)
            .ok_or_else(|| ModelError::InvalidTarget(format!("{module}={state_id}")))?;
        Self::new(module, id)
    }

    /// Encode as the `{module: state_id}` singleton mapping.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(
            self.module.as_str().to_string(),
            Value::String(self.state_id.as_str().to_string()),
        );
        Value::Object(map)
    }

    /// Decode a `{module: state_id}` singleton mapping.
    ///
    /// Numeric and boolean ids are accepted and rendered as strings.
    pub fn from_value(value: &Value) -> Result<Self, ModelError> {
        let Value::Object(map) = value else {
            return Err(ModelError::InvalidTarget(value.to_string()));
        };
        let mut entries = map.iter();
        let (Some((module, id)), None) = (entries.next(), entries.next()) else {
            return Err(ModelError::InvalidTarget(value.to_string()));
        };
        Self::from_pair(module, id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module, self.state_id)
    }
}

impl From<Target> for Value {
    fn from(target: Target) -> Self {
        target.to_value()
    }
}

impl From<&Target> for Value {
    fn from(target: &Target) -> Self {
        target.to_value()
    }
}

/// Encode the accumulated targets of one kind as the output list.
pub fn encode_targets<'a>(targets: impl IntoIterator<Item = &'a Target>) -> Value {
    Value::Array(targets.into_iter().map(Target::to_value).collect())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_names_round_trip() {
        for kind in RequisiteKind::ALL {
            assert_eq!(kind.as_str().parse::<RequisiteKind>(), Ok(kind));
        }
        assert!("run".parse::<RequisiteKind>().is_err());
        assert_eq!(RequisiteKind::from_name("managed"), None);
    }

    #[test]
    fn target_encodes_as_singleton_mapping() {
        let target = Target::new("cmd", "X").expect("target");
        assert_eq!(target.to_value(), json!({"cmd": "X"}));
        assert_eq!(Target::from_value(&json!({"cmd": "X"})), Ok(target));
    }

    #[test]
    fn target_rejects_multi_key_mappings() {
        assert!(Target::from_value(&json!({"cmd": "X", "pkg": "Y"})).is_err());
        assert!(Target::from_value(&json!("cmd")).is_err());
        assert!(Target::from_value(&json!({"cmd": ""})).is_err());
    }
}
