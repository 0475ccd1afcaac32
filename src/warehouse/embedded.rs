//! Embedded DuckDB warehouse for local runs and tests
//!
//! Stages are emulated by an object-storage prefix. Every copied file is
//! recorded in `etl_load_history`, which drives already-loaded skipping,
//! `FORCE` and the load checkpoint the same way the warehouse copy history
//! does. Table names are used unqualified.

use super::sql::{self, quote_literal, Dialect};
use super::traits::{Warehouse, WarehouseConnector};
use super::types::{CopiedFile, CopyOutcome, CopyRequest, Row, SqlValue, TableDef, TableName};
use crate::credentials::CredentialBundle;
use crate::error::{Error, Result};
use crate::storage::{ObjectStorage, PrefixLocation};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use duckdb::types::{TimeUnit, Value};
use duckdb::{params_from_iter, Connection};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

const LOAD_HISTORY_DDL: &str = "CREATE TABLE IF NOT EXISTS etl_load_history (
    table_name VARCHAR,
    file_name VARCHAR,
    last_load_time TIMESTAMP,
    row_count BIGINT
)";

/// A named stage backed by an object-storage prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageBinding {
    pub name: String,
    pub location: PrefixLocation,
}

// ============================================================================
// Connector
// ============================================================================

/// Opens sessions against one DuckDB database
///
/// The database is opened once; each session is a separate connection to it,
/// so an in-memory database survives across invocations of the same process.
pub struct DuckDbConnector {
    root: Mutex<Connection>,
    path: String,
    storage: ObjectStorage,
    stage: Option<StageBinding>,
}

impl fmt::Debug for DuckDbConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuckDbConnector")
            .field("path", &self.path)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl DuckDbConnector {
    /// Open the database at `path` (`:memory:` for an in-memory database)
    pub fn open(path: &str, storage: ObjectStorage, stage: Option<StageBinding>) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| Error::warehouse(format!("Failed to open DuckDB database {path}: {e}")))?;

        Ok(Self {
            root: Mutex::new(conn),
            path: path.to_string(),
            storage,
            stage,
        })
    }

    /// In-memory database without a stage
    pub fn in_memory(storage: ObjectStorage) -> Result<Self> {
        Self::open(":memory:", storage, None)
    }
}

#[async_trait]
impl WarehouseConnector for DuckDbConnector {
    async fn connect(&self, credentials: &CredentialBundle) -> Result<Box<dyn Warehouse>> {
        let conn = self
            .root
            .lock()
            .map_err(|_| Error::warehouse("DuckDB connection lock poisoned"))?
            .try_clone()?;

        debug!(path = %self.path, user = %credentials.user, "Opened DuckDB session");
        Ok(Box::new(DuckDbWarehouse {
            conn: Some(conn),
            storage: self.storage.clone(),
            stage: self.stage.clone(),
        }))
    }
}

// ============================================================================
// Session
// ============================================================================

/// One DuckDB connection
pub struct DuckDbWarehouse {
    conn: Option<Connection>,
    storage: ObjectStorage,
    stage: Option<StageBinding>,
}

impl DuckDbWarehouse {
    fn conn(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::warehouse("Session is closed"))
    }

    fn execute_ddl(&mut self, stmt: &str) -> Result<()> {
        debug!(sql = %stmt, "Executing statement");
        self.conn()?.execute_batch(stmt)?;
        Ok(())
    }

    fn count(&mut self, table: &str) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row(&sql::row_count(table), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn stage_for(&self, name: &str, table: &TableName) -> Result<StageBinding> {
        match self.stage {
            Some(ref stage) if stage.name.eq_ignore_ascii_case(name) => Ok(stage.clone()),
            _ => Err(Error::load(
                table.to_string(),
                format!("Stage '@{name}' does not exist"),
            )),
        }
    }

    fn already_loaded(&mut self, table: &str, file: &str) -> Result<bool> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM etl_load_history WHERE table_name = ? AND file_name = ?",
            [table, file],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn record_load(&mut self, table: &str, file: &str, rows: u64) -> Result<()> {
        let values = [
            Value::Text(table.to_string()),
            Value::Text(file.to_string()),
            Value::Timestamp(TimeUnit::Microsecond, Utc::now().timestamp_micros()),
            Value::BigInt(rows as i64),
        ];
        self.conn()?.execute(
            "INSERT INTO etl_load_history VALUES (?, ?, ?, ?)",
            params_from_iter(values.iter()),
        )?;
        Ok(())
    }

    /// Copy one CSV file into `table`, returning the rows added
    fn copy_file(&mut self, table: &str, data: &Bytes) -> Result<u64> {
        let temp_file = std::env::temp_dir().join(format!("s3_warehouse_etl_{}.csv", temp_id()));
        std::fs::write(&temp_file, data)?;
        let temp_path = temp_file
            .to_str()
            .ok_or_else(|| Error::warehouse("Invalid temp path"))?
            .to_string();

        let before = self.count(table)?;
        let stmt = format!(
            "COPY {table} FROM {} (FORMAT CSV, HEADER, DELIMITER ',', QUOTE '\"')",
            quote_literal(&temp_path)
        );
        debug!(sql = %stmt, "Executing statement");
        let copied = self.conn()?.execute_batch(&stmt);
        let _ = std::fs::remove_file(&temp_file);
        copied?;

        Ok(self.count(table)?.saturating_sub(before))
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    fn backend(&self) -> &'static str {
        "duckdb"
    }

    async fn create_or_replace_table(&mut self, table: &TableDef) -> Result<()> {
        let stmt = sql::create_or_replace_table(table, &table.name.name, Dialect::DuckDb);
        self.execute_ddl(&stmt)
    }

    async fn create_table_if_not_exists(&mut self, table: &TableDef) -> Result<()> {
        let stmt = sql::create_table_if_not_exists(table, &table.name.name, Dialect::DuckDb);
        self.execute_ddl(&stmt)
    }

    async fn insert_rows(&mut self, table: &TableDef, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let stmt = sql::insert_rows(table, &table.name.name, rows.len());
        let values: Vec<Value> = rows.iter().flatten().map(to_duckdb_value).collect();

        let tx = self.conn()?.transaction()?;
        debug!(sql = %stmt, bindings = values.len(), "Executing statement");
        match tx.execute(&stmt, params_from_iter(values.iter())) {
            Ok(inserted) => {
                tx.commit()?;
                Ok(inserted as u64)
            }
            Err(e) => {
                tx.rollback()?;
                Err(Error::load(table.name.to_string(), e.to_string()))
            }
        }
    }

    async fn copy_from_stage(&mut self, request: &CopyRequest) -> Result<CopyOutcome> {
        let stage = self.stage_for(&request.stage, &request.table)?;
        let table = request.table.name.clone();
        self.execute_ddl(LOAD_HISTORY_DDL)?;

        let mut candidates: Vec<_> = self
            .storage
            .list(&stage.location)
            .await?
            .into_iter()
            .map(|obj| (stage.location.relative_key(&obj.location.key).to_string(), obj))
            .collect();

        if let Some(ref files) = request.files {
            if let Some(missing) = files
                .iter()
                .find(|f| !candidates.iter().any(|(rel, _)| rel == *f))
            {
                return Err(Error::load(
                    request.table.to_string(),
                    format!("Remote file '{missing}' was not found in stage '@{}'", stage.name),
                ));
            }
            candidates.retain(|(rel, _)| files.contains(rel));
        }
        if let Some(after) = request.modified_after {
            candidates.retain(|(_, obj)| obj.last_modified > after);
        }

        let mut outcome = CopyOutcome::default();
        for (_, obj) in candidates {
            let file = obj.location.to_string();
            if !request.force && self.already_loaded(&table, &file)? {
                debug!(file = %file, "Skipping already loaded file");
                continue;
            }

            let data = self.storage.get(&obj.location).await?;
            let rows = self
                .copy_file(&table, &data)
                .map_err(|e| Error::load(request.table.to_string(), e.to_string()))?;
            self.record_load(&table, &file, rows)?;

            info!(file = %file, rows, "Copied staged file");
            outcome.files.push(CopiedFile {
                file,
                status: "LOADED".to_string(),
                rows_loaded: rows,
            });
        }

        Ok(outcome)
    }

    async fn load_checkpoint(&mut self, table: &TableName) -> Result<Option<DateTime<Utc>>> {
        self.execute_ddl(LOAD_HISTORY_DDL)?;
        let micros: Option<i64> = self.conn()?.query_row(
            "SELECT epoch_us(MAX(last_load_time)) FROM etl_load_history WHERE table_name = ?",
            [table.name.as_str()],
            |row| row.get(0),
        )?;
        Ok(micros.and_then(DateTime::from_timestamp_micros))
    }

    async fn row_count(&mut self, table: &TableName) -> Result<u64> {
        self.count(&table.name)
    }

    async fn close(&mut self) -> Result<()> {
        if self.conn.take().is_some() {
            debug!("Closed DuckDB session");
        }
        Ok(())
    }
}

fn to_duckdb_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Integer(i) => Value::BigInt(*i),
        SqlValue::Timestamp(ts) => {
            Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }
    }
}

/// Unique suffix for temp files
fn temp_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{nanos:x}_{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
