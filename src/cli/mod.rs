//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `lambda` - Serve events from the Lambda runtime (default inside Lambda)
//! - `run` - Process objects locally as one synthetic event
//! - `seed` - Upload sample data and optionally invoke the function
//! - `check` - Resolve credentials and open one warehouse session
//! - `checkpoint` - Print the load checkpoint of the copy target

mod commands;
mod runner;

pub use commands::{Cli, Commands, InvocationModeArg, OutputFormat};
pub use runner::{resolve_command, Runner, LAMBDA_RUNTIME_ENV};
