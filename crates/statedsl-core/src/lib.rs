pub mod args;
pub mod compose;
pub mod context;
pub mod embedded;
pub mod error;
pub mod handle;
pub mod node;
pub mod ordering;
pub mod registry;
pub mod render;

pub use args::{Args, Invocation};
pub use context::{DEFAULT_ENV, RenderContext};
pub use embedded::{
    CallOutcome, Callable, CallableFn, EmbeddedCall, EmbeddedCallError, FunctionCatalog,
};
pub use error::{RenderError, Result};
pub use handle::{NodeMut, StateHandle};
pub use node::{NodeKey, StateFunctionNode};
pub use ordering::order_requisites;
pub use registry::{ANONYMOUS_PREFIX, Registry};
pub use render::Rendered;
