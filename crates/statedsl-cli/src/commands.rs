use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span};

use statedsl_core::{RenderContext, Rendered};
use statedsl_model::HighState;
use statedsl_script::render_with;

use crate::cli::{OutputFormatArg, RenderArgs, SourceArgs};
use crate::summary::print_summary;

/// Render the script and return the serialized document.
pub fn run_render(args: &RenderArgs) -> Result<String> {
    let rendered = render_source(&args.source)?;
    format_document(&rendered.high, args.format)
}

pub fn run_inspect(args: &SourceArgs) -> Result<()> {
    let rendered = render_source(args)?;
    print_summary(&document_id(args), &rendered.high);
    Ok(())
}

/// Read the script and any merge documents, then render them together.
pub fn render_source(args: &SourceArgs) -> Result<Rendered> {
    let sls = document_id(args);
    let span = info_span!("script", sls = %sls, path = %args.script.display());
    let _guard = span.enter();

    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("read script {}", args.script.display()))?;
    let documents = args
        .merge
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>>>()?;

    let context = RenderContext::new(sls)
        .with_env(args.env.as_str())
        .ordered(args.ordered);
    let rendered = render_with(&source, context, |registry| {
        for document in &documents {
            registry.load_highstate(document)?;
        }
        Ok(())
    })
    .with_context(|| format!("render {}", args.script.display()))?;

    info!(
        states = rendered.high.states.len(),
        calls = rendered.calls.len(),
        "script rendered"
    );
    Ok(rendered)
}

/// Parse a declarative YAML document.
pub fn load_document(path: &Path) -> Result<HighState> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read document {}", path.display()))?;
    let high: HighState = serde_yaml::from_str(&text)
        .with_context(|| format!("parse document {}", path.display()))?;
    debug!(path = %path.display(), states = high.states.len(), "document loaded");
    Ok(high)
}

pub fn format_document(high: &HighState, format: OutputFormatArg) -> Result<String> {
    match format {
        OutputFormatArg::Yaml => serde_yaml::to_string(high).context("serialize YAML"),
        OutputFormatArg::Json => serde_json::to_string_pretty(high)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .context("serialize JSON"),
    }
}

/// The `--sls` value, or the script's file stem.
pub fn document_id(args: &SourceArgs) -> String {
    args.sls.clone().unwrap_or_else(|| {
        args.script
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}
