//! Script front-end: parses fluent state scripts and replays them against a
//! fresh [`Registry`].
//!
//! ```text
//! include('base')
//! state('A').cmd.run('ls -la', cwd='/var/tmp')
//! state('B').service.running().watch(cmd='A')
//! ```

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod parser;

use statedsl_core::{Registry, RenderContext, Rendered};
use tracing::{debug, info_span};

pub use error::{EvalError, Result, ScriptError};
pub use interpreter::{CONFIG_OBJECT, Interpreter};
pub use parser::parse_program;

/// Render one script with its own registry.
pub fn render_script(source: &str, context: RenderContext) -> Result<Rendered> {
    render_with(source, context, |_| Ok(()))
}

/// Render a script after `prepare` has seeded the registry, e.g. with
/// already-declarative documents.
pub fn render_with<F>(source: &str, context: RenderContext, prepare: F) -> Result<Rendered>
where
    F: FnOnce(&mut Registry) -> statedsl_core::Result<()>,
{
    let program = {
        let _span = info_span!("parse", sls = %context.sls).entered();
        parse_program(source)?
    };
    debug!(statements = program.statements.len(), "script parsed");
    let mut registry = Registry::new(context);
    prepare(&mut registry)?;
    Interpreter::new(&mut registry).run(&program)?;
    Ok(registry.finalize()?)
}
