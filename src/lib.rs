// Allow common clippy pedantic lints that aren't critical for this codebase
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

//! # s3-warehouse-etl
//!
//! An event-driven ETL pipeline: a CSV file lands in object storage, a
//! serverless function extracts and normalizes it and loads it into a cloud
//! data warehouse, optionally running a downstream transformation tool.
//!
//! ## Features
//!
//! - **Credentials**: environment variables or a secrets-manager lookup
//! - **Two load strategies**: destructive recreate + insert, or a staged
//!   `COPY INTO` with optional `FORCE` or incremental `MODIFIED_AFTER`
//! - **Two warehouse backends**: Snowflake over its REST session protocol,
//!   embedded DuckDB for local runs and tests
//! - **Seed utility**: upload sample files and invoke the function directly
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use s3_warehouse_etl::{config::PipelineConfig, pipeline::Pipeline};
//!
//! let config = PipelineConfig::load(None)?;
//! let pipeline = Pipeline::from_config(&config).await?;
//! let response = pipeline.handle(&event).await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │          Notification event → Pipeline::handle_event             │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌────────────┬───────────┬──────┴──────┬──────────────┬───────────┐
//! │ Credentials│  Extract  │  Transform  │     Load     │  Trigger  │
//! ├────────────┼───────────┼─────────────┼──────────────┼───────────┤
//! │ Env vars   │ S3 GET    │ Title case  │ Direct insert│ dbt run   │
//! │ Secrets    │ CSV parse │ Age / sex   │ Staged COPY  │ Lambda    │
//! │ Manager    │           │ Age groups  │ Snowflake    │ invoke    │
//! │            │           │             │ DuckDB       │           │
//! └────────────┴───────────┴─────────────┴──────────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Common types and type aliases
pub mod types;

/// Layered pipeline configuration
pub mod config;

/// Bucket-addressed object storage
pub mod storage;

/// Warehouse credential resolution
pub mod credentials;

/// Notification parsing and CSV extraction
pub mod extract;

/// Record normalization
pub mod transform;

/// Warehouse sessions (Snowflake, DuckDB)
pub mod warehouse;

/// Direct insert and staged copy
pub mod load;

/// Transformation and load triggers
pub mod trigger;

/// Sample data upload
pub mod seed;

/// Per-invocation state machine
pub mod pipeline;

/// Lambda runtime entry point
pub mod handler;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use pipeline::{InvocationReport, InvocationResponse, Pipeline};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
