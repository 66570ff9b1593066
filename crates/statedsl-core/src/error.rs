//! Render errors.
//!
//! Every error aborts the current render; none are downgraded to warnings.
//! Errors raised by a declaration carry the offending state id and module.

use statedsl_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// A `(state id, module)` pair received two different verbs.
    #[error(
        "Multiple state functions specified for state-module pair {state_id}.{module}: \
         {existing} already declared, {requested} requested"
    )]
    DuplicateAction {
        state_id: String,
        module: String,
        existing: String,
        requested: String,
    },

    /// A `(state id, module)` pair has arguments or requisites but no verb.
    #[error("No state function specified for {state_id}.{module}")]
    MissingAction { state_id: String, module: String },

    /// A requisite target could not be decoded.
    #[error("Invalid requisite declaration on {state_id}.{module}: {message}")]
    InvalidRequisite {
        state_id: String,
        module: String,
        message: String,
    },

    /// The call shape does not fit the declarative schema.
    #[error("Invalid arguments for {state_id}.{module}: {message}")]
    InvalidArguments {
        state_id: String,
        module: String,
        message: String,
    },

    /// `extend` names a state id that was never declared in this render.
    #[error("Cannot extend undeclared state {state_id}")]
    UnknownState { state_id: String },

    /// `extend` was called after ordered mode was turned on.
    #[error("Cannot extend state {state_id} after the ordered option was turned on")]
    ExtendAfterOrdered { state_id: String },

    /// The configuration call named an option that does not exist.
    #[error("Unknown render option: {name}")]
    UnknownOption { name: String },

    /// The configuration call supplied a value of the wrong type.
    #[error("Invalid value for render option {name}: {message}")]
    InvalidOption { name: String, message: String },

    /// The option was already configured to a different value.
    #[error("Render option {name} was already configured")]
    OptionsLocked { name: String },

    /// No callable of this name is registered in the function catalog.
    #[error("Unknown callable: {name}")]
    UnknownCallable { name: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
