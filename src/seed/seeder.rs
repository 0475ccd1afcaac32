//! Sample data generation and upload

use crate::config::SeedConfig;
use crate::error::{Error, Result};
use crate::storage::{ObjectLocation, ObjectStorage};
use crate::transform::Clock;
use crate::trigger::{InvokeOutcome, LoadTrigger};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const PEOPLE_HEADER: [&str; 4] = ["first", "last", "age", "sex"];
const PEOPLE_ROWS: [[&str; 4]; 2] = [["Alice", "Brown", "30", "F"], ["Charlie", "Davis", "40", "M"]];

const EMPLOYEE_HEADER: [&str; 4] = ["id", "name", "department", "salary"];
const EMPLOYEE_ROWS: [[&str; 4]; 3] = [
    ["1", "Alice Brown", "Engineering", "85000"],
    ["2", "Charlie Davis", "Marketing", "72000"],
    ["3", "Dana Evans", "Finance", "64000"],
];

/// Which sample file to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SeedVariant {
    /// `first,last,age,sex` rows the pipeline transforms
    #[default]
    People,
    /// `id,name,department,salary` rows (uploaded only)
    Employees,
}

impl SeedVariant {
    /// Sample CSV for this variant, header included
    pub fn sample_csv(self) -> Result<String> {
        match self {
            SeedVariant::People => write_csv(&PEOPLE_HEADER, PEOPLE_ROWS.iter().map(|r| r.to_vec())),
            SeedVariant::Employees => {
                write_csv(&EMPLOYEE_HEADER, EMPLOYEE_ROWS.iter().map(|r| r.to_vec()))
            }
        }
    }
}

/// Timestamped object key: `<prefix>YYYYmmdd_HHMMSS.csv`
pub fn object_key(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// An employee appended by [`mutate_employees`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub department: String,
    pub salary: u64,
}

impl Default for NewEmployee {
    fn default() -> Self {
        Self {
            name: "Evan Foster".to_string(),
            department: "Sales".to_string(),
            salary: 58000,
        }
    }
}

/// Raise every salary by `raise_percent` and append `new_employee` with the next id
///
/// Salaries are rounded to whole units.
pub fn mutate_employees(csv: &str, raise_percent: f64, new_employee: &NewEmployee) -> Result<String> {
    let invalid = |message: String| Error::extraction("employee data", message);

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(csv.as_bytes());
    let header = reader
        .headers()
        .map_err(|e| invalid(e.to_string()))?
        .clone();
    if header.iter().ne(EMPLOYEE_HEADER) {
        return Err(invalid(format!(
            "expected columns {}, found {}",
            EMPLOYEE_HEADER.join(","),
            header.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let factor = 1.0 + raise_percent / 100.0;
    let mut max_id = 0u64;
    let mut rows = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| invalid(format!("row {}: {e}", index + 1)))?;
        let id: u64 = row[0]
            .parse()
            .map_err(|_| invalid(format!("row {}: invalid id '{}'", index + 1, &row[0])))?;
        let salary: f64 = row[3]
            .parse()
            .map_err(|_| invalid(format!("row {}: invalid salary '{}'", index + 1, &row[3])))?;

        max_id = max_id.max(id);
        rows.push(vec![
            id.to_string(),
            row[1].to_string(),
            row[2].to_string(),
            format!("{:.0}", salary * factor),
        ]);
    }

    rows.push(vec![
        (max_id + 1).to_string(),
        new_employee.name.clone(),
        new_employee.department.clone(),
        new_employee.salary.to_string(),
    ]);
    write_csv(&EMPLOYEE_HEADER, rows.into_iter())
}

fn write_csv<R, F>(header: &[&str], rows: R) -> Result<String>
where
    R: Iterator<Item = Vec<F>>,
    F: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    let to_err = |e: csv::Error| Error::Other(format!("Failed to write CSV: {e}"));
    writer.write_record(header).map_err(to_err)?;
    for row in rows {
        writer.write_record(&row).map_err(to_err)?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| Error::Other(format!("Failed to write CSV: {e}")))?;
    String::from_utf8(data).map_err(|e| Error::Other(format!("Failed to write CSV: {e}")))
}

// ============================================================================
// Seeder
// ============================================================================

/// What a seed run wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedOutcome {
    /// `s3://bucket/key` of the written object
    pub location: String,
    /// Data rows written
    pub rows: usize,
    /// Function invocation, if one was attempted and succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked: Option<InvokeOutcome>,
}

/// Uploads sample files and optionally fires the load trigger
#[derive(Debug, Clone)]
pub struct Seeder {
    storage: ObjectStorage,
    bucket: String,
    prefix: String,
    function_name: Option<String>,
    trigger: Option<LoadTrigger>,
    clock: Arc<dyn Clock>,
}

impl Seeder {
    pub fn new(storage: ObjectStorage, config: &SeedConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            function_name: config.function_name.clone(),
            trigger: None,
            clock,
        }
    }

    /// Invoke the configured function after every upload
    pub fn with_trigger(mut self, trigger: LoadTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Upload the sample file for `variant` under a fresh timestamped key
    pub async fn upload(&self, variant: SeedVariant) -> Result<SeedOutcome> {
        let csv = variant.sample_csv()?;
        self.write(csv).await
    }

    /// Read an employee file, apply a raise plus one new hire, and upload the
    /// result under a fresh timestamped key
    pub async fn mutate(
        &self,
        key: &str,
        raise_percent: f64,
        new_employee: &NewEmployee,
    ) -> Result<SeedOutcome> {
        let source = ObjectLocation::new(&self.bucket, key);
        let data = self.storage.get(&source).await?;
        let text = std::str::from_utf8(&data)
            .map_err(|e| Error::extraction(source.to_string(), format!("not UTF-8: {e}")))?;

        let csv = mutate_employees(text, raise_percent, new_employee).map_err(|e| match e {
            Error::Extraction { message, .. } => Error::extraction(source.to_string(), message),
            other => other,
        })?;
        self.write(csv).await
    }

    async fn write(&self, csv: String) -> Result<SeedOutcome> {
        let location = ObjectLocation::new(&self.bucket, object_key(&self.prefix, self.clock.now()));
        let rows = csv.lines().count().saturating_sub(1);

        self.storage.put(&location, Bytes::from(csv)).await?;
        info!(location = %location, rows, "Uploaded seed file");

        let invoked = match (&self.trigger, &self.function_name) {
            (Some(trigger), Some(function)) => trigger.fire(function).await,
            _ => None,
        };

        Ok(SeedOutcome {
            location: location.to_string(),
            rows,
            invoked,
        })
    }
}
