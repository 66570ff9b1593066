//! The declarative document consumed by the execution engine.
//!
//! A [`HighState`] maps state ids to [`StateDecl`]s, which map module names to
//! [`ModuleDecl`]s. A module declaration serializes as the list
//! `[verb, {key: value}, {key: value}, ...]`. Two reserved top-level keys carry
//! composition data: `include` (a list of document names) and `extend` (state
//! declarations that override states of included documents).
//!
//! Every level keeps insertion order, both when serializing and when reading a
//! document back, so a loaded document re-emits in the same order.

use serde::de;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{ModelError, ModuleName, StateId};

/// Top-level key holding included document names.
pub const INCLUDE_KEY: &str = "include";
/// Top-level key holding extension overrides.
pub const EXTEND_KEY: &str = "extend";

/// One `{key: value}` entry of a module declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclArg {
    pub key: String,
    pub value: Value,
}

impl DeclArg {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.key.clone(), self.value.clone());
        Value::Object(map)
    }
}

/// The declarative list of one `(state id, module)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDecl {
    /// The verb, e.g. `run`. Extension overrides may omit it.
    pub function: Option<String>,
    pub args: Vec<DeclArg>,
}

impl ModuleDecl {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(DeclArg::new(key, value));
        self
    }

    /// First value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|arg| arg.key == key)
            .map(|arg| &arg.value)
    }

    /// Length of the declarative list (verb included).
    pub fn len(&self) -> usize {
        self.args.len() + usize::from(self.function.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        let mut items = Vec::with_capacity(self.len());
        if let Some(function) = &self.function {
            items.push(Value::String(function.clone()));
        }
        items.extend(self.args.iter().map(DeclArg::to_value));
        Value::Array(items)
    }

    /// Decode a declarative list. The first bare string is the verb; every
    /// other entry must be a single-key mapping.
    pub fn from_items(
        state_id: &str,
        module: &str,
        items: &[Value],
    ) -> Result<Self, ModelError> {
        let malformed = |message: String| ModelError::MalformedDeclaration {
            state_id: state_id.to_string(),
            module: module.to_string(),
            message,
        };
        let mut decl = ModuleDecl::default();
        for item in items {
            match item {
                Value::String(verb) => {
                    if let Some(existing) = &decl.function {
                        return Err(malformed(format!(
                            "multiple state functions ({existing}, {verb})"
                        )));
                    }
                    decl.function = Some(verb.clone());
                }
                Value::Object(map) if map.len() == 1 => {
                    if let Some((key, value)) = map.iter().next() {
                        decl.args.push(DeclArg::new(key.clone(), value.clone()));
                    }
                }
                other => {
                    return Err(malformed(format!("unexpected entry {other}")));
                }
            }
        }
        Ok(decl)
    }
}

impl Serialize for ModuleDecl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        if let Some(function) = &self.function {
            seq.serialize_element(function)?;
        }
        for arg in &self.args {
            seq.serialize_element(&SingleEntry(&arg.key, &arg.value))?;
        }
        seq.end()
    }
}

struct SingleEntry<'a>(&'a str, &'a Value);

impl Serialize for SingleEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

/// All module declarations of one state id, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDecl {
    modules: Vec<(ModuleName, ModuleDecl)>,
}

impl StateDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module: &str) -> Option<&ModuleDecl> {
        self.modules
            .iter()
            .find(|(name, _)| name.as_str() == module)
            .map(|(_, decl)| decl)
    }

    /// Insert or replace a module declaration. A replaced module keeps its
    /// original position.
    pub fn insert(&mut self, module: ModuleName, decl: ModuleDecl) {
        match self.modules.iter_mut().find(|(name, _)| *name == module) {
            Some((_, existing)) => *existing = decl,
            None => self.modules.push((module, decl)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleName, &ModuleDecl)> {
        self.modules.iter().map(|(name, decl)| (name, decl))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .modules
            .iter()
            .map(|(name, decl)| (name.as_str().to_string(), decl.to_value()))
            .collect();
        Value::Object(map)
    }

    /// Decode a `{module: [...]}` mapping. A dotted key (`cmd.run`) carries
    /// the verb in its suffix.
    pub fn from_map(state_id: &str, map: &Map<String, Value>) -> Result<Self, ModelError> {
        let mut decl = StateDecl::new();
        for (key, value) in map {
            let (module, dotted_verb) = match key.rsplit_once('.') {
                Some((module, verb)) => (module, Some(verb)),
                None => (key.as_str(), None),
            };
            let items = match value {
                Value::Array(items) => items.as_slice(),
                Value::Null => &[],
                other => {
                    return Err(ModelError::MalformedDeclaration {
                        state_id: state_id.to_string(),
                        module: module.to_string(),
                        message: format!("expected a list, found {other}"),
                    });
                }
            };
            let mut module_decl = ModuleDecl::from_items(state_id, module, items)?;
            if let Some(verb) = dotted_verb {
                match &module_decl.function {
                    Some(existing) if existing != verb => {
                        return Err(ModelError::MalformedDeclaration {
                            state_id: state_id.to_string(),
                            module: module.to_string(),
                            message: format!("multiple state functions ({verb}, {existing})"),
                        });
                    }
                    _ => module_decl.function = Some(verb.to_string()),
                }
            }
            decl.absorb(state_id, ModuleName::new(module)?, module_decl)?;
        }
        Ok(decl)
    }

    /// Add a decoded module, merging with an earlier key for the same module
    /// (`cmd.run` next to `cmd`). Two different verbs are rejected; otherwise
    /// the arguments are appended in key order.
    fn absorb(
        &mut self,
        state_id: &str,
        module: ModuleName,
        decl: ModuleDecl,
    ) -> Result<(), ModelError> {
        let Some((_, existing)) = self.modules.iter_mut().find(|(name, _)| *name == module) else {
            self.modules.push((module, decl));
            return Ok(());
        };
        if let (Some(current), Some(verb)) = (&existing.function, &decl.function)
            && current != verb
        {
            return Err(ModelError::MalformedDeclaration {
                state_id: state_id.to_string(),
                module: module.to_string(),
                message: format!("multiple state functions ({current}, {verb})"),
            });
        }
        if existing.function.is_none() {
            existing.function = decl.function;
        }
        existing.args.extend(decl.args);
        Ok(())
    }
}

impl Serialize for StateDecl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.modules.len()))?;
        for (name, decl) in &self.modules {
            map.serialize_entry(name.as_str(), decl)?;
        }
        map.end()
    }
}

/// The complete declarative document of one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighState {
    pub include: Vec<String>,
    pub extend: Vec<(StateId, StateDecl)>,
    pub states: Vec<(StateId, StateDecl)>,
}

impl HighState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state_id: &str) -> Option<&StateDecl> {
        lookup(&self.states, state_id)
    }

    pub fn get_extend(&self, state_id: &str) -> Option<&StateDecl> {
        lookup(&self.extend, state_id)
    }

    pub fn contains(&self, state_id: &str) -> bool {
        self.get(state_id).is_some()
    }

    /// Number of top-level keys, counting `include` and `extend` when present.
    pub fn len(&self) -> usize {
        self.states.len()
            + usize::from(!self.include.is_empty())
            + usize::from(!self.extend.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state_ids(&self) -> impl Iterator<Item = &StateId> {
        self.states.iter().map(|(id, _)| id)
    }

    /// Render as an order-preserving JSON value.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if !self.include.is_empty() {
            map.insert(
                INCLUDE_KEY.to_string(),
                Value::Array(self.include.iter().cloned().map(Value::String).collect()),
            );
        }
        if !self.extend.is_empty() {
            let extend: Map<String, Value> = self
                .extend
                .iter()
                .map(|(id, decl)| (id.as_str().to_string(), decl.to_value()))
                .collect();
            map.insert(EXTEND_KEY.to_string(), Value::Object(extend));
        }
        for (id, decl) in &self.states {
            map.insert(id.as_str().to_string(), decl.to_value());
        }
        Value::Object(map)
    }

    /// Decode a document from a JSON value (the shape produced by
    /// [`HighState::to_value`] or any other front-end).
    pub fn from_value(value: &Value) -> Result<Self, ModelError> {
        let Value::Object(map) = value else {
            return Err(ModelError::MalformedDeclaration {
                state_id: String::new(),
                module: String::new(),
                message: format!("expected a mapping of state ids, found {value}"),
            });
        };
        let mut high = HighState::new();
        for (key, value) in map {
            match key.as_str() {
                INCLUDE_KEY => high.include = decode_include(value)?,
                EXTEND_KEY => {
                    let Value::Object(extend) = value else {
                        return Err(malformed_top(EXTEND_KEY, value));
                    };
                    for (id, decl) in extend {
                        let state_id = StateId::new(id.as_str())?;
                        let decl = decode_state(id, decl)?;
                        high.extend.push((state_id, decl));
                    }
                }
                id => {
                    let state_id = StateId::new(id)?;
                    let decl = decode_state(id, value)?;
                    high.states.push((state_id, decl));
                }
            }
        }
        Ok(high)
    }
}

fn lookup<'a>(entries: &'a [(StateId, StateDecl)], state_id: &str) -> Option<&'a StateDecl> {
    entries
        .iter()
        .find(|(id, _)| id.as_str() == state_id)
        .map(|(_, decl)| decl)
}

fn decode_state(state_id: &str, value: &Value) -> Result<StateDecl, ModelError> {
    match value {
        Value::Object(map) => StateDecl::from_map(state_id, map),
        Value::Null => Ok(StateDecl::new()),
        other => Err(malformed_top(state_id, other)),
    }
}

fn decode_include(value: &Value) -> Result<Vec<String>, ModelError> {
    let Value::Array(items) = value else {
        return Err(malformed_top(INCLUDE_KEY, value));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(malformed_top(INCLUDE_KEY, other)),
        })
        .collect()
}

fn malformed_top(key: &str, value: &Value) -> ModelError {
    ModelError::MalformedDeclaration {
        state_id: key.to_string(),
        module: String::new(),
        message: format!("unexpected value {value}"),
    }
}

impl Serialize for HighState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.len();
        let mut map = serializer.serialize_map(Some(len))?;
        if !self.include.is_empty() {
            map.serialize_entry(INCLUDE_KEY, &self.include)?;
        }
        if !self.extend.is_empty() {
            map.serialize_entry(EXTEND_KEY, &OrderedStates(&self.extend))?;
        }
        for (id, decl) in &self.states {
            map.serialize_entry(id.as_str(), decl)?;
        }
        map.end()
    }
}

struct OrderedStates<'a>(&'a [(StateId, StateDecl)]);

impl Serialize for OrderedStates<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, decl) in self.0 {
            map.serialize_entry(id.as_str(), decl)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HighState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // `Value` maps keep document order, so decoding through them keeps
        // state and module positions intact.
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(HighState::new());
        }
        HighState::from_value(&value).map_err(de::Error::custom)
    }
}
