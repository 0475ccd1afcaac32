//! Direct insert and staged copy

use super::types::LoadOutcome;
use crate::config::PipelineConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::storage::{ObjectLocation, PrefixLocation};
use crate::transform::EnrichedRecord;
use crate::types::{CopyScope, LoadStrategy};
use crate::warehouse::{CopyRequest, Row, SqlValue, TableDef, TableName, Warehouse};
use tracing::{debug, info};

/// Loads data into the warehouse using the configured strategy
#[derive(Debug, Clone)]
pub struct Loader {
    strategy: LoadStrategy,
    target: TableDef,
    raw: TableDef,
    stage: String,
    stage_location: Option<PrefixLocation>,
    copy_scope: CopyScope,
    force: bool,
    incremental: bool,
}

impl Loader {
    /// Create a loader from the pipeline config
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let target = TableName::parse(&config.warehouse.target_table)
            .map_err(|e| Error::invalid_value("warehouse.target_table", e.to_string()))?;
        let raw = TableName::parse(&config.warehouse.raw_table)
            .map_err(|e| Error::invalid_value("warehouse.raw_table", e.to_string()))?;
        let stage_location = config
            .load
            .stage_url
            .as_deref()
            .map(PrefixLocation::parse)
            .transpose()?;

        Ok(Self {
            strategy: config.load.strategy,
            target: TableDef::enriched(target),
            raw: TableDef::raw(raw),
            stage: config.load.stage.clone(),
            stage_location,
            copy_scope: config.load.copy_scope,
            force: config.load.force,
            incremental: config.load.incremental,
        })
    }

    /// Configured strategy
    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Table receiving bulk copies
    pub fn raw_table(&self) -> &TableName {
        &self.raw.name
    }

    /// Recreate the target table and insert all records in one transaction
    ///
    /// The table is replaced on every call, so only the rows of the latest
    /// call remain.
    pub async fn direct_insert(
        &self,
        warehouse: &mut dyn Warehouse,
        records: &[EnrichedRecord],
    ) -> Result<LoadOutcome> {
        let table = self.target.name.to_string();
        let rows: Vec<Row> = records.iter().map(to_row).collect();

        warehouse
            .create_or_replace_table(&self.target)
            .await
            .map_err(|e| as_load_error(&table, e))?;
        let inserted = warehouse
            .insert_rows(&self.target, &rows)
            .await
            .map_err(|e| as_load_error(&table, e))?;

        info!(
            table = %table,
            rows = inserted,
            backend = warehouse.backend(),
            "Inserted records"
        );
        let mut outcome = LoadOutcome::new(table);
        outcome.rows_loaded = inserted;
        Ok(outcome)
    }

    /// Bulk copy staged files into the raw table
    ///
    /// With the `event_file` scope one copy runs per object, restricted to
    /// that file; with `all_files` a single copy covers the whole stage.
    pub async fn staged_copy(
        &self,
        warehouse: &mut dyn Warehouse,
        objects: &[ObjectLocation],
    ) -> Result<LoadOutcome> {
        let table = self.raw.name.to_string();
        let mut outcome = LoadOutcome::new(table.clone());

        warehouse
            .create_table_if_not_exists(&self.raw)
            .await
            .map_err(|e| as_load_error(&table, e))?;

        if self.incremental {
            outcome.modified_after = warehouse
                .load_checkpoint(&self.raw.name)
                .await
                .map_err(|e| as_load_error(&table, e))?;
            debug!(table = %table, checkpoint = ?outcome.modified_after, "Read load checkpoint");
        }

        let requests: Vec<CopyRequest> = match self.copy_scope {
            CopyScope::EventFile => objects
                .iter()
                .map(|obj| self.copy_request(Some(vec![self.stage_relative(obj)]), &outcome))
                .collect(),
            CopyScope::AllFiles => vec![self.copy_request(None, &outcome)],
        };

        for request in requests {
            let copied = warehouse
                .copy_from_stage(&request)
                .await
                .map_err(|e| as_load_error(&table, e))?;
            outcome.rows_loaded += copied.rows_loaded();
            outcome
                .files
                .extend(copied.files.into_iter().map(|f| f.file));
        }

        info!(
            table = %table,
            rows = outcome.rows_loaded,
            files = outcome.files.len(),
            backend = warehouse.backend(),
            "Copied staged files"
        );
        Ok(outcome)
    }

    fn copy_request(&self, files: Option<Vec<String>>, outcome: &LoadOutcome) -> CopyRequest {
        CopyRequest {
            table: self.raw.name.clone(),
            stage: self.stage.clone(),
            files,
            modified_after: outcome.modified_after,
            force: self.force,
        }
    }

    /// Path of an object relative to the stage root
    ///
    /// Without a known stage location the stage is assumed to sit at the
    /// bucket root.
    fn stage_relative(&self, object: &ObjectLocation) -> String {
        match self.stage_location {
            Some(ref stage) if stage.bucket == object.bucket => {
                stage.relative_key(&object.key).to_string()
            }
            _ => object.key.clone(),
        }
    }
}

/// Bound values of one enriched record, in table column order
pub fn to_row(record: &EnrichedRecord) -> Row {
    vec![
        SqlValue::from(record.first.clone()),
        SqlValue::from(record.last.clone()),
        SqlValue::Integer(record.age),
        SqlValue::from(record.sex.as_str()),
        SqlValue::from(record.age_group.map(|g| g.label().to_string())),
        SqlValue::Timestamp(record.load_time),
    ]
}

/// Everything that fails during a load is a load failure
fn as_load_error(table: &str, error: Error) -> Error {
    if error.kind() == ErrorKind::Load {
        error
    } else {
        Error::load(table, error.to_string())
    }
}
