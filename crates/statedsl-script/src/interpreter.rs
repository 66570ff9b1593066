//! Evaluates a parsed script against a [`Registry`].

use std::collections::HashMap;

use serde_json::{Map, Value};
use statedsl_core::{Args, Callable, NodeKey, Registry, RenderError};
use statedsl_model::{HighState, StateId};
use tracing::{debug, trace};

use crate::ast::{CallArg, Expr, Literal, Program, Statement, StatementKind};
use crate::error::{EvalError, ScriptError};

/// Name of the configuration object exposed to scripts.
pub const CONFIG_OBJECT: &str = "__dsl__";

type Eval<T> = std::result::Result<T, EvalError>;

/// A runtime value.
#[derive(Debug, Clone)]
enum Object {
    Data(Value),
    State(StateId),
    Node(NodeKey),
    /// `node.verb` before it is called.
    Verb { node: NodeKey, verb: String },
    Builtin(Builtin),
    Callable(Callable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    State,
    Include,
    Extend,
    Config,
    ConfigSet,
    ConfigLoadHighstate,
}

impl Builtin {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "state" => Some(Builtin::State),
            "include" => Some(Builtin::Include),
            "extend" => Some(Builtin::Extend),
            CONFIG_OBJECT => Some(Builtin::Config),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Builtin::State => "state",
            Builtin::Include => "include",
            Builtin::Extend => "extend",
            Builtin::Config => CONFIG_OBJECT,
            Builtin::ConfigSet => "set",
            Builtin::ConfigLoadHighstate => "load_highstate",
        }
    }
}

impl Object {
    fn kind(&self) -> &'static str {
        match self {
            Object::Data(_) => "value",
            Object::State(_) => "state",
            Object::Node(_) => "state function",
            Object::Verb { .. } => "state function call",
            Object::Builtin(_) => "builtin",
            Object::Callable(_) => "callable",
        }
    }
}

/// Evaluated call arguments, before conversion to declaration arguments.
struct CallArgs {
    positional: Vec<Object>,
    keywords: Vec<(String, Object)>,
}

pub struct Interpreter<'r> {
    registry: &'r mut Registry,
    variables: HashMap<String, Object>,
}

impl<'r> Interpreter<'r> {
    pub fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            variables: HashMap::new(),
        }
    }

    /// Run every statement in order. The first failure aborts the script.
    pub fn run(&mut self, program: &Program) -> Result<(), ScriptError> {
        for statement in &program.statements {
            self.execute(statement)
                .map_err(|source| ScriptError::Eval {
                    line: statement.line,
                    source,
                })?;
        }
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Eval<()> {
        trace!(line = statement.line, "executing statement");
        match &statement.kind {
            StatementKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.variables.insert(target.clone(), value);
            }
            StatementKind::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Eval<Object> {
        match expr {
            Expr::Literal(literal) => Ok(Object::Data(literal_value(literal))),
            Expr::Name(name) => self.resolve(name),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item).and_then(into_value))
                    .collect::<Eval<Vec<_>>>()?;
                Ok(Object::Data(Value::Array(values)))
            }
            Expr::Dict(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.eval(key).and_then(into_value)? {
                        Value::String(key) => key,
                        other => other.to_string(),
                    };
                    let value = self.eval(value).and_then(into_value)?;
                    map.insert(key, value);
                }
                Ok(Object::Data(Value::Object(map)))
            }
            Expr::Attr { base, name } => {
                let base = self.eval(base)?;
                self.attribute(base, name)
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = self.eval_args(args)?;
                self.call(callee, args)
            }
        }
    }

    fn resolve(&self, name: &str) -> Eval<Object> {
        if let Some(value) = self.variables.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = Builtin::lookup(name) {
            return Ok(Object::Builtin(builtin));
        }
        match self.registry.callable(name) {
            Ok(callable) => Ok(Object::Callable(callable)),
            Err(RenderError::UnknownCallable { .. }) => {
                Err(EvalError::UndefinedName(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn attribute(&mut self, base: Object, name: &str) -> Eval<Object> {
        match base {
            Object::State(id) => {
                let node = self.registry.state(Some(id.as_str()))?.module(name)?;
                Ok(Object::Node(node.key().clone()))
            }
            Object::Node(node) => Ok(Object::Verb {
                node,
                verb: name.to_string(),
            }),
            Object::Builtin(Builtin::Config) => match name {
                "set" => Ok(Object::Builtin(Builtin::ConfigSet)),
                "load_highstate" => Ok(Object::Builtin(Builtin::ConfigLoadHighstate)),
                _ => Err(EvalError::NoAttribute {
                    kind: CONFIG_OBJECT,
                    name: name.to_string(),
                }),
            },
            other => Err(EvalError::NoAttribute {
                kind: other.kind(),
                name: name.to_string(),
            }),
        }
    }

    fn eval_args(&mut self, args: &[CallArg]) -> Eval<CallArgs> {
        let mut evaluated = CallArgs {
            positional: Vec::new(),
            keywords: Vec::new(),
        };
        for arg in args {
            match arg {
                CallArg::Positional(expr) => evaluated.positional.push(self.eval(expr)?),
                CallArg::Keyword(name, expr) => {
                    let value = self.eval(expr)?;
                    evaluated.keywords.push((name.clone(), value));
                }
            }
        }
        Ok(evaluated)
    }

    fn call(&mut self, callee: Object, args: CallArgs) -> Eval<Object> {
        match callee {
            Object::Builtin(builtin) => self.call_builtin(builtin, args),
            Object::State(id) => {
                // state(id)(module, verb, ...)
                let mut positional = args.positional.into_iter();
                let module = expect_str(positional.next(), "state", "module name")?;
                let verb = expect_str(positional.next(), "state", "state function name")?;
                if verb == "call" {
                    let key = self
                        .registry
                        .state(Some(id.as_str()))?
                        .module(&module)?
                        .key()
                        .clone();
                    return self.embed(key, positional, args.keywords);
                }
                let args = declaration_args(positional, args.keywords)?;
                let node = self
                    .registry
                    .state(Some(id.as_str()))?
                    .declare(&module, &verb, args)?;
                Ok(Object::Node(node.key().clone()))
            }
            Object::Node(key) => {
                // node(verb, ...) or node(**kwargs) to continue the action
                let mut positional = args.positional.into_iter().peekable();
                let verb = match positional.peek() {
                    Some(Object::Data(Value::String(_))) => {
                        Some(expect_str(positional.next(), key.module.as_str(), "verb")?)
                    }
                    _ => None,
                };
                if verb.as_deref() == Some("call") {
                    return self.embed(key, positional, args.keywords);
                }
                let args = declaration_args(positional, args.keywords)?;
                let node = self
                    .registry
                    .node_handle(key)
                    .invoke(verb.as_deref(), args)?;
                Ok(Object::Node(node.key().clone()))
            }
            Object::Verb { node, verb } if verb == "call" => {
                self.embed(node, args.positional.into_iter(), args.keywords)
            }
            Object::Verb { node, verb } => {
                let args = declaration_args(args.positional.into_iter(), args.keywords)?;
                let node = self
                    .registry
                    .node_handle(node)
                    .invoke(Some(verb.as_str()), args)?;
                Ok(Object::Node(node.key().clone()))
            }
            other => Err(EvalError::NotCallable(other.kind())),
        }
    }

    /// Record an embedded call on `key`. The first positional argument must
    /// be the callable; the rest are passed to it at invocation.
    fn embed(
        &mut self,
        key: NodeKey,
        mut positional: impl Iterator<Item = Object>,
        keywords: Vec<(String, Object)>,
    ) -> Eval<Object> {
        let Some(Object::Callable(callable)) = positional.next() else {
            return Err(EvalError::InvalidArguments {
                callee: "call".to_string(),
                message: "expects a callable as its first argument".to_string(),
            });
        };
        let args = declaration_args(positional, keywords)?;
        let node = self.registry.node_handle(key).call(callable, args)?;
        Ok(Object::Node(node.key().clone()))
    }

    fn call_builtin(&mut self, builtin: Builtin, args: CallArgs) -> Eval<Object> {
        match builtin {
            Builtin::State => {
                if !args.keywords.is_empty() || args.positional.len() > 1 {
                    return Err(invalid(builtin, "takes at most one state id"));
                }
                let id = match args.positional.into_iter().next() {
                    None | Some(Object::Data(Value::Null)) => None,
                    Some(Object::Data(value)) => Some(scalar_string(value)),
                    Some(other) => {
                        return Err(invalid(
                            builtin,
                            &format!("expects a state id, not a {}", other.kind()),
                        ));
                    }
                };
                let handle = self.registry.state(id.as_deref())?;
                Ok(Object::State(handle.id().clone()))
            }
            Builtin::Include => {
                if !args.keywords.is_empty() {
                    return Err(invalid(builtin, "takes no keyword arguments"));
                }
                let names = args
                    .positional
                    .into_iter()
                    .map(|arg| match arg {
                        Object::Data(Value::String(name)) => Ok(name),
                        other => Err(invalid(
                            builtin,
                            &format!("expects document names, not a {}", other.kind()),
                        )),
                    })
                    .collect::<Eval<Vec<_>>>()?;
                self.registry.include(names);
                Ok(Object::Data(Value::Null))
            }
            Builtin::Extend => {
                let ids = args
                    .positional
                    .into_iter()
                    .map(|arg| match arg {
                        Object::State(id) => Ok(id),
                        Object::Node(key) => Ok(key.state_id),
                        other => Err(invalid(
                            builtin,
                            &format!("expects states, not a {}", other.kind()),
                        )),
                    })
                    .collect::<Eval<Vec<_>>>()?;
                self.registry.extend(&ids)?;
                Ok(Object::Data(Value::Null))
            }
            Builtin::ConfigSet => {
                if !args.positional.is_empty() {
                    return Err(invalid(builtin, "takes keyword arguments only"));
                }
                for (name, value) in args.keywords {
                    let value = into_value(value)?;
                    self.registry.set_option(&name, &value)?;
                }
                Ok(Object::Data(Value::Null))
            }
            Builtin::ConfigLoadHighstate => {
                let mut positional = args.positional.into_iter();
                let (Some(Object::Data(document)), None) = (positional.next(), positional.next())
                else {
                    return Err(invalid(builtin, "expects one declarative document"));
                };
                let high = match document {
                    Value::String(text) => serde_yaml::from_str::<HighState>(&text)
                        .map_err(|err| EvalError::Document(err.to_string()))?,
                    value => HighState::from_value(&value).map_err(RenderError::from)?,
                };
                debug!(states = high.states.len(), "loading declarative document");
                self.registry.load_highstate(&high)?;
                Ok(Object::Data(Value::Null))
            }
            Builtin::Config => Err(EvalError::NotCallable(CONFIG_OBJECT)),
        }
    }
}

fn invalid(builtin: Builtin, message: &str) -> EvalError {
    EvalError::InvalidArguments {
        callee: builtin.name().to_string(),
        message: message.to_string(),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::None => Value::Null,
        Literal::Bool(value) => Value::Bool(*value),
        Literal::Int(value) => Value::from(*value),
        Literal::Float(value) => Value::from(*value),
        Literal::Str(value) => Value::String(value.clone()),
    }
}

/// Convert an evaluated argument into declaration data. A state-function
/// node becomes its `{module: state_id}` reference.
fn into_value(object: Object) -> Eval<Value> {
    match object {
        Object::Data(value) => Ok(value),
        Object::Node(key) => Ok(key.target().to_value()),
        other => Err(EvalError::NotAValue(other.kind())),
    }
}

fn declaration_args(
    positional: impl Iterator<Item = Object>,
    keywords: Vec<(String, Object)>,
) -> Eval<Args> {
    let positional = positional.map(into_value).collect::<Eval<Vec<_>>>()?;
    let named = keywords
        .into_iter()
        .map(|(name, value)| into_value(value).map(|value| (name, value)))
        .collect::<Eval<Vec<_>>>()?;
    Ok(Args::from_parts(positional, named))
}

fn expect_str(object: Option<Object>, callee: &str, what: &str) -> Eval<String> {
    match object {
        Some(Object::Data(Value::String(value))) => Ok(value),
        _ => Err(EvalError::InvalidArguments {
            callee: callee.to_string(),
            message: format!("expects a {what}"),
        }),
    }
}

fn scalar_string(value: Value) -> String {
    match value {
        Value::String(value) => value,
        other => other.to_string(),
    }
}
