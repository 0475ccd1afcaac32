//! Warehouse-facing types: identifiers, table shapes, bound values and copy results

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Unquoted identifier: letter or underscore, then letters, digits, `_` or `$`
static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap());

// ============================================================================
// Table Names
// ============================================================================

/// A validated, optionally qualified table name (`[database.][schema.]name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    /// Parse and validate a dotted table name
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        if parts.len() > 3 {
            return Err(Error::config(format!(
                "Table name '{raw}' has more than three parts"
            )));
        }
        if let Some(bad) = parts.iter().find(|p| !is_identifier(p)) {
            return Err(Error::config(format!(
                "Table name '{raw}' contains invalid identifier '{bad}'"
            )));
        }

        let mut parts = parts.into_iter().rev().map(ToString::to_string);
        let name = parts.next().unwrap_or_default();
        let schema = parts.next();
        let database = parts.next();
        Ok(Self {
            database,
            schema,
            name,
        })
    }

    /// Fully qualified name, filling in missing parts from the session defaults
    pub fn qualified(&self, database: &str, schema: &str) -> String {
        format!(
            "{}.{}.{}",
            self.database.as_deref().unwrap_or(database),
            self.schema.as_deref().unwrap_or(schema),
            self.name
        )
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref db) = self.database {
            write!(f, "{db}.")?;
        }
        if let Some(ref schema) = self.schema {
            write!(f, "{schema}.")?;
        }
        f.write_str(&self.name)
    }
}

/// Whether `s` is a valid unquoted identifier
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER_REGEX.is_match(s)
}

// ============================================================================
// Table Definitions
// ============================================================================

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Timestamp,
}

/// A column of a table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Target table shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: TableName,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Enriched shape written by direct insert
    pub fn enriched(name: TableName) -> Self {
        Self {
            name,
            columns: vec![
                ColumnDef::new("first", ColumnType::Text),
                ColumnDef::new("last", ColumnType::Text),
                ColumnDef::new("age", ColumnType::Integer),
                ColumnDef::new("sex", ColumnType::Text),
                ColumnDef::new("age_group", ColumnType::Text),
                ColumnDef::new("load_time", ColumnType::Timestamp),
            ],
        }
    }

    /// Raw shape receiving bulk copies of the landed CSV files
    pub fn raw(name: TableName) -> Self {
        Self {
            name,
            columns: vec![
                ColumnDef::new("first", ColumnType::Text),
                ColumnDef::new("last", ColumnType::Text),
                ColumnDef::new("age", ColumnType::Integer),
                ColumnDef::new("sex", ColumnType::Text),
            ],
        }
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

// ============================================================================
// Values
// ============================================================================

/// A value bound to a statement parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Timestamp(NaiveDateTime),
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Text)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

/// One row of bound values, in table column order
pub type Row = Vec<SqlValue>;

// ============================================================================
// Bulk Copy
// ============================================================================

/// Parameters of a `COPY INTO` from a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// Target table
    pub table: TableName,
    /// Stage name, without `@`
    pub stage: String,
    /// Restrict the copy to these stage-relative files
    pub files: Option<Vec<String>>,
    /// Only consider files modified after this instant
    pub modified_after: Option<DateTime<Utc>>,
    /// Reload files that were already loaded
    pub force: bool,
}

/// Per-file result of a copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedFile {
    pub file: String,
    pub status: String,
    pub rows_loaded: u64,
}

/// Result of a copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    pub files: Vec<CopiedFile>,
}

impl CopyOutcome {
    /// Rows loaded across every processed file
    pub fn rows_loaded(&self) -> u64 {
        self.files.iter().map(|f| f.rows_loaded).sum()
    }
}
