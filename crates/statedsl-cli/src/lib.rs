//! Command-line front-end for rendering state scripts.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
