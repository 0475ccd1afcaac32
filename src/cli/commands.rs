//! CLI commands and argument parsing

use crate::seed::SeedVariant;
use crate::types::InvocationMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Event-driven S3 to warehouse ETL
#[derive(Parser, Debug)]
#[command(name = "s3-warehouse-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true, env = "ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Defaults to `lambda` inside a Lambda runtime
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Serve notification events from the Lambda runtime
    Lambda,

    /// Process objects locally as one synthetic notification
    Run {
        /// Object URL (s3://bucket/key), repeatable
        #[arg(short, long = "object", required = true)]
        objects: Vec<String>,
    },

    /// Upload sample data
    Seed {
        /// Sample file to upload
        #[arg(long, value_enum, default_value = "people")]
        variant: SeedVariant,

        /// Rewrite an existing employee file instead (key in the seed bucket)
        #[arg(long, value_name = "KEY", conflicts_with = "variant")]
        mutate: Option<String>,

        /// Salary raise in percent applied by --mutate
        #[arg(long, default_value = "5")]
        raise_percent: f64,

        /// Invoke the configured function after the upload
        #[arg(long)]
        invoke: bool,

        /// Invocation type used by --invoke (defaults to the config)
        #[arg(long, value_enum)]
        invocation: Option<InvocationModeArg>,
    },

    /// Resolve credentials and open one warehouse session
    Check,

    /// Print the load checkpoint of the copy target table
    Checkpoint,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Invocation type accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InvocationModeArg {
    Event,
    RequestResponse,
}

impl From<InvocationModeArg> for InvocationMode {
    fn from(arg: InvocationModeArg) -> Self {
        match arg {
            InvocationModeArg::Event => InvocationMode::Event,
            InvocationModeArg::RequestResponse => InvocationMode::RequestResponse,
        }
    }
}
