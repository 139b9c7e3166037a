#![forbid(unsafe_code)]

//! `tabkit` command-line tool: inspect, validate and maintain the blobs a
//! tabkit shell persists.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

pub use cli::{Cli, Commands, GlobalArgs, LayoutsCommand, run, run_from_env};
pub use error::{CliError, Result};
