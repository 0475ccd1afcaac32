//! Load results

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a load did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    /// Target table as configured
    pub table: String,
    /// Rows inserted or copied
    pub rows_loaded: u64,
    /// Files copied (staged copy only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// `MODIFIED_AFTER` filter applied (incremental staged copy only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_after: Option<DateTime<Utc>>,
}

impl LoadOutcome {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows_loaded: 0,
            files: Vec::new(),
            modified_after: None,
        }
    }
}
