//! Arbitrary callables embedded as state actions.
//!
//! `node.call(callable, args)` does not run the callable while rendering. It
//! records a `call` action that points at a wrapper id; the wrapper keeps the
//! callable and a copy of its arguments so the execution engine can invoke it
//! later and read back a `{result, changes, comment}` mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Signature of an embedded callable: positional and keyword arguments in,
/// a result mapping out.
pub type CallableFn = dyn Fn(&[Value], &Map<String, Value>) -> anyhow::Result<Value> + Send + Sync;

/// A named function value that can be embedded as a state action.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Arc<CallableFn>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value], &Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when both values share the same underlying function.
    pub fn same_function(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable").field("name", &self.name).finish()
    }
}

/// Callables a script may reference by name.
#[derive(Clone, Default)]
pub struct FunctionCatalog {
    functions: BTreeMap<String, Callable>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable under its own name, replacing any previous entry.
    pub fn register(&mut self, callable: Callable) {
        self.functions.insert(callable.name.clone(), callable);
    }

    #[must_use]
    pub fn with(mut self, callable: Callable) -> Self {
        self.register(callable);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

/// Execution-time failures of an embedded call.
#[derive(Debug, Error)]
pub enum EmbeddedCallError {
    /// The callable itself returned an error.
    #[error("embedded call {id} failed: {source}")]
    Raised {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The callable returned something other than a result mapping.
    #[error("embedded call {id} returned a malformed result: {message}")]
    MalformedResult { id: String, message: String },
}

/// Result of running an embedded call, in the execution engine's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub result: bool,
    pub changes: Map<String, Value>,
    pub comment: String,
}

impl CallOutcome {
    /// Translate a callable's return mapping.
    ///
    /// `result` (bool) and `changes` (mapping) are required; `comment` is
    /// optional and must be a string when present.
    pub fn from_return(id: &str, value: Value) -> Result<Self, EmbeddedCallError> {
        let malformed = |message: &str| EmbeddedCallError::MalformedResult {
            id: id.to_string(),
            message: message.to_string(),
        };
        let Value::Object(mut map) = value else {
            return Err(malformed("expected a mapping"));
        };
        let result = match map.remove("result") {
            Some(Value::Bool(result)) => result,
            Some(_) => return Err(malformed("`result` must be a bool")),
            None => return Err(malformed("missing `result`")),
        };
        let changes = match map.remove("changes") {
            Some(Value::Object(changes)) => changes,
            Some(_) => return Err(malformed("`changes` must be a mapping")),
            None => return Err(malformed("missing `changes`")),
        };
        let comment = match map.remove("comment") {
            Some(Value::String(comment)) => comment,
            Some(Value::Null) | None => String::new(),
            Some(_) => return Err(malformed("`comment` must be a string")),
        };
        Ok(Self {
            result,
            changes,
            comment,
        })
    }
}

/// A callable captured together with its arguments at declaration time.
#[derive(Debug, Clone)]
pub struct EmbeddedCall {
    pub id: String,
    pub state_id: String,
    pub callable: Callable,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl EmbeddedCall {
    /// Run the callable with the captured arguments.
    pub fn invoke(&self) -> Result<CallOutcome, EmbeddedCallError> {
        debug!(id = %self.id, callable = %self.callable.name, "invoking embedded call");
        let value = (self.callable.func)(self.args.as_slice(), &self.kwargs).map_err(|source| {
            EmbeddedCallError::Raised {
                id: self.id.clone(),
                source,
            }
        })?;
        CallOutcome::from_return(&self.id, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo() -> Callable {
        Callable::new("echo", |args, kwargs| {
            Ok(json!({"result": true, "changes": {"args": args, "kwargs": kwargs}}))
        })
    }

    #[test]
    fn invoke_passes_captured_arguments() {
        let mut kwargs = Map::new();
        kwargs.insert("x".to_string(), json!(1));
        let call = EmbeddedCall {
            id: "C::echo#0".to_string(),
            state_id: "C".to_string(),
            callable: echo(),
            args: vec![json!(1), json!(2)],
            kwargs,
        };
        let outcome = call.invoke().expect("invoke");
        assert!(outcome.result);
        assert_eq!(outcome.changes["args"], json!([1, 2]));
        assert_eq!(outcome.changes["kwargs"], json!({"x": 1}));
        assert_eq!(outcome.comment, "");
    }

    #[test]
    fn malformed_results_are_reported() {
        assert!(CallOutcome::from_return("id", json!(true)).is_err());
        assert!(CallOutcome::from_return("id", json!({"result": "yes", "changes": {}})).is_err());
        assert!(CallOutcome::from_return("id", json!({"result": true})).is_err());
        let outcome =
            CallOutcome::from_return("id", json!({"result": false, "changes": {}, "comment": "no"}))
                .expect("outcome");
        assert!(!outcome.result);
        assert_eq!(outcome.comment, "no");
    }

    #[test]
    fn raised_errors_keep_the_wrapper_id() {
        let call = EmbeddedCall {
            id: "C::boom#1".to_string(),
            state_id: "C".to_string(),
            callable: Callable::new("boom", |_, _| anyhow::bail!("boom")),
            args: Vec::new(),
            kwargs: Map::new(),
        };
        let err = call.invoke().expect_err("raise");
        assert!(err.to_string().contains("C::boom#1"));
    }

    #[test]
    fn catalog_looks_up_by_name() {
        let catalog = FunctionCatalog::new().with(echo());
        assert!(catalog.contains("echo"));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["echo"]);
        assert!(catalog.get("missing").is_none());
    }
}
