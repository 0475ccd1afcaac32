//! CSV extraction from object storage

use super::types::{Dataset, Record};
use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::storage::{ObjectLocation, ObjectStorage};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

/// Reads one object and parses it as a headed CSV file
#[derive(Debug, Clone)]
pub struct Extractor {
    storage: ObjectStorage,
    delimiter: u8,
    expected_columns: Vec<String>,
}

impl Extractor {
    /// Create an extractor over the given storage
    pub fn new(storage: ObjectStorage, config: &ExtractConfig) -> Result<Self> {
        let delimiter = u8::try_from(config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::invalid_value(
                    "extract.delimiter",
                    format!("'{}' is not a single-byte character", config.delimiter),
                )
            })?;

        Ok(Self {
            storage,
            delimiter,
            expected_columns: config.expected_columns.clone(),
        })
    }

    /// Read the object and parse its rows
    ///
    /// Any read or parse failure fails the whole file.
    pub async fn extract(&self, location: &ObjectLocation) -> Result<Dataset> {
        let bytes = self.storage.get(location).await?;
        debug!(location = %location, bytes = bytes.len(), "Read object");

        let text = std::str::from_utf8(&bytes)
            .map_err(|e| Error::extraction(location.to_string(), format!("not UTF-8: {e}")))?;

        let dataset = self.parse(location, text)?;
        info!(location = %location, rows = dataset.len(), "Extracted dataset");
        Ok(dataset)
    }

    /// Parse CSV text read from `location`
    pub fn parse(&self, location: &ObjectLocation, text: &str) -> Result<Dataset> {
        let fail = |message: String| Error::extraction(location.to_string(), message);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| fail(format!("unreadable header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let missing: Vec<&str> = self
            .expected_columns
            .iter()
            .filter(|c| !header.iter().any(|h| h == *c))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(fail(format!("missing columns: {}", missing.join(", "))));
        }

        let columns = ColumnIndex::new(&header);
        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| fail(format!("row {}: {e}", line + 1)))?;
            records.push(columns.record(&row));
        }

        Ok(Dataset {
            source: location.clone(),
            header,
            records,
        })
    }
}

/// Positions of the record fields within a header
struct ColumnIndex {
    first: Option<usize>,
    last: Option<usize>,
    age: Option<usize>,
    sex: Option<usize>,
}

impl ColumnIndex {
    fn new(header: &[String]) -> Self {
        let find = |name: &str| header.iter().position(|h| h == name);
        Self {
            first: find("first"),
            last: find("last"),
            age: find("age"),
            sex: find("sex"),
        }
    }

    fn record(&self, row: &StringRecord) -> Record {
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i));
        Record::new(
            cell(self.first),
            cell(self.last),
            cell(self.age),
            cell(self.sex),
        )
    }
}
