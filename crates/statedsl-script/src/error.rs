use statedsl_core::RenderError;
use thiserror::Error;

/// Failure to render a script. Parse and evaluation errors carry the 1-based
/// line of the offending statement.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("syntax error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("error on line {line}: {source}")]
    Eval { line: usize, source: EvalError },

    /// Raised while assembling the output, after every statement ran.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ScriptError {
    /// Line of the offending statement, if the error belongs to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Parse { line, .. } | ScriptError::Eval { line, .. } => Some(*line),
            ScriptError::Render(_) => None,
        }
    }
}

/// Errors raised while evaluating one statement.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    #[error("{kind} has no attribute '{name}'")]
    NoAttribute { kind: &'static str, name: String },

    #[error("{0} is not callable")]
    NotCallable(&'static str),

    #[error("{callee}() {message}")]
    InvalidArguments { callee: String, message: String },

    #[error("cannot use {0} as a value")]
    NotAValue(&'static str),

    #[error("invalid declarative document: {0}")]
    Document(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
