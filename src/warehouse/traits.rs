//! Warehouse and connector seams

use super::types::{CopyOutcome, CopyRequest, Row, TableDef, TableName};
use crate::credentials::CredentialBundle;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One open warehouse session
///
/// A session serves exactly one invocation and must be closed by the caller
/// on success and on failure.
#[async_trait]
pub trait Warehouse: Send {
    /// Backend name for logs
    fn backend(&self) -> &'static str;

    /// Drop and recreate a table
    async fn create_or_replace_table(&mut self, table: &TableDef) -> Result<()>;

    /// Create a table unless it already exists
    async fn create_table_if_not_exists(&mut self, table: &TableDef) -> Result<()>;

    /// Insert rows in a single transaction, rolling back on failure
    ///
    /// Returns the number of rows inserted.
    async fn insert_rows(&mut self, table: &TableDef, rows: &[Row]) -> Result<u64>;

    /// Bulk copy staged files into a table
    async fn copy_from_stage(&mut self, request: &CopyRequest) -> Result<CopyOutcome>;

    /// Latest recorded load time for a table, `None` if it was never loaded
    async fn load_checkpoint(&mut self, table: &TableName) -> Result<Option<DateTime<Utc>>>;

    /// Number of rows in a table
    async fn row_count(&mut self, table: &TableName) -> Result<u64>;

    /// End the session; further calls fail
    async fn close(&mut self) -> Result<()>;
}

/// Opens warehouse sessions from resolved credentials
#[async_trait]
pub trait WarehouseConnector: Send + Sync + std::fmt::Debug {
    async fn connect(&self, credentials: &CredentialBundle) -> Result<Box<dyn Warehouse>>;
}
