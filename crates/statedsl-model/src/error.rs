use thiserror::Error;

/// Errors raised while building or decoding model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// State ids must contain at least one non-whitespace character.
    #[error("invalid state id: {0:?}")]
    InvalidStateId(String),

    /// Module names must be non-empty.
    #[error("invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// The name is not one of the recognized requisite kinds.
    #[error("unknown requisite kind: {0}")]
    UnknownRequisite(String),

    /// A requisite target was not a `{module: state_id}` mapping.
    #[error("invalid requisite target: {0}")]
    InvalidTarget(String),

    /// A module declaration could not be decoded.
    #[error("malformed declaration for {state_id}.{module}: {message}")]
    MalformedDeclaration {
        state_id: String,
        module: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
