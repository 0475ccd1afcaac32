// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! s3-warehouse-etl CLI
//!
//! Runs the pipeline inside Lambda or locally

use clap::Parser;
use s3_warehouse_etl::cli::{Cli, Runner, LAMBDA_RUNTIME_ENV};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    // CloudWatch gets one JSON object per line
    let json = cli.json_logs || std::env::var_os(LAMBDA_RUNTIME_ENV).is_some();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().without_time().init();
    } else {
        builder.init();
    }

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        tracing::error!(kind = %e.kind(), error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
