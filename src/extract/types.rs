//! Extracted dataset types

use crate::storage::ObjectLocation;
use serde::{Deserialize, Serialize};

/// One raw CSV row
///
/// Empty cells are missing values. Columns other than these four are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub first: Option<String>,
    pub last: Option<String>,
    pub age: Option<String>,
    pub sex: Option<String>,
}

impl Record {
    /// Build a record from cell values, treating blank cells as missing
    pub fn new(
        first: Option<&str>,
        last: Option<&str>,
        age: Option<&str>,
        sex: Option<&str>,
    ) -> Self {
        let cell = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(ToString::to_string);
        Self {
            first: cell(first),
            last: cell(last),
            age: cell(age),
            sex: cell(sex),
        }
    }
}

/// Parsed contents of one object
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Object the rows came from
    pub source: ObjectLocation,
    /// Header row as found in the file
    pub header: Vec<String>,
    /// Rows in file order
    pub records: Vec<Record>,
}

impl Dataset {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the file had no data rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
