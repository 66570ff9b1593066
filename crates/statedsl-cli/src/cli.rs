//! CLI argument definitions for the state script renderer.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use statedsl_core::DEFAULT_ENV;

#[derive(Parser)]
#[command(
    name = "statedsl",
    version,
    about = "Render fluent state scripts into declarative state documents",
    long_about = "Render fluent state scripts into declarative state documents.\n\n\
                  Scripts declare states with state(id).module.function(...) calls;\n\
                  the rendered document is written to stdout as YAML or JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a script and print the declarative document.
    Render(RenderArgs),

    /// Render a script and print a per-state summary table.
    Inspect(SourceArgs),
}

/// Script input and render configuration shared by every subcommand.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Path to the script to render.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Document id of the script (default: the script's file stem).
    #[arg(long = "sls", value_name = "ID")]
    pub sls: Option<String>,

    /// Environment the script is rendered for.
    #[arg(long = "env", value_name = "ENV", default_value = DEFAULT_ENV)]
    pub env: String,

    /// Start in ordered mode: each state function requires the one declared
    /// before it.
    #[arg(long = "ordered")]
    pub ordered: bool,

    /// Declarative YAML document merged into the output before the script
    /// runs. May be given more than once.
    #[arg(long = "merge", value_name = "FILE")]
    pub merge: Vec<PathBuf>,
}

#[derive(Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format of the rendered document.
    #[arg(long = "format", value_enum, default_value = "yaml")]
    pub format: OutputFormatArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Yaml,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
