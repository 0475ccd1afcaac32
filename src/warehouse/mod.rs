//! Warehouse access
//!
//! The [`Warehouse`] trait is the load seam: one open session per invocation
//! offering table DDL, transactional inserts, bulk copies from a stage and the
//! load checkpoint. Two backends implement it:
//!
//! - [`SnowflakeWarehouse`] - Snowflake over its REST session protocol
//! - [`DuckDbWarehouse`] - embedded DuckDB with an emulated stage

mod embedded;
mod snowflake;
pub mod sql;
mod traits;
mod types;

pub use embedded::{DuckDbConnector, DuckDbWarehouse, StageBinding};
pub use snowflake::{QueryResult, SnowflakeConnector, SnowflakeWarehouse};
pub use traits::{Warehouse, WarehouseConnector};
pub use types::{
    is_identifier, ColumnDef, ColumnType, CopiedFile, CopyOutcome, CopyRequest, Row, SqlValue,
    TableDef, TableName,
};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::storage::{ObjectStorage, PrefixLocation};
use crate::types::WarehouseBackend;
use std::sync::Arc;
use std::time::Duration;

/// Build the connector selected by the config
///
/// `storage` backs the emulated stage of the DuckDB backend.
pub fn build_connector(
    config: &PipelineConfig,
    storage: &ObjectStorage,
) -> Result<Arc<dyn WarehouseConnector>> {
    match config.warehouse.backend {
        WarehouseBackend::Snowflake => Ok(Arc::new(SnowflakeConnector::new(
            config.warehouse.base_url.clone(),
            Duration::from_secs(config.warehouse.request_timeout_seconds),
        ))),
        WarehouseBackend::Duckdb => {
            let stage = config
                .load
                .stage_url
                .as_deref()
                .map(PrefixLocation::parse)
                .transpose()?
                .map(|location| StageBinding {
                    name: config.load.stage.clone(),
                    location,
                });
            Ok(Arc::new(DuckDbConnector::open(
                &config.warehouse.duckdb_path,
                storage.clone(),
                stage,
            )?))
        }
    }
}
