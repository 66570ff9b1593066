pub mod error;
pub mod highstate;
pub mod ids;
pub mod options;
pub mod requisite;

pub use error::{ModelError, Result};
pub use highstate::{DeclArg, EXTEND_KEY, HighState, INCLUDE_KEY, ModuleDecl, StateDecl};
pub use ids::{ModuleName, StateId};
pub use options::{ORDERED_OPTION, RenderOptions};
pub use requisite::{RequisiteKind, Target, encode_targets};
