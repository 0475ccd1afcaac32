//! SQL statement rendering
//!
//! Identifiers are validated [`TableName`]s and column names from a
//! [`TableDef`]; data values are always bound, never interpolated. The only
//! literals rendered inline are stage-relative file names and the
//! `MODIFIED_AFTER` timestamp, both quoted with [`quote_literal`].

use super::types::{ColumnType, CopyRequest, TableDef};
use chrono::{DateTime, SecondsFormat, Utc};

/// SQL flavor of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Snowflake,
    DuckDb,
}

impl Dialect {
    fn column_type(self, column_type: ColumnType) -> &'static str {
        match (self, column_type) {
            (Dialect::Snowflake, ColumnType::Text) => "STRING",
            (Dialect::Snowflake, ColumnType::Integer) => "INT",
            (Dialect::Snowflake, ColumnType::Timestamp) => "TIMESTAMP_NTZ",
            (Dialect::DuckDb, ColumnType::Text) => "VARCHAR",
            (Dialect::DuckDb, ColumnType::Integer) => "BIGINT",
            (Dialect::DuckDb, ColumnType::Timestamp) => "TIMESTAMP",
        }
    }
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn column_list(table: &TableDef, dialect: Dialect) -> String {
    table
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, dialect.column_type(c.column_type)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE OR REPLACE TABLE`
pub fn create_or_replace_table(table: &TableDef, qualified: &str, dialect: Dialect) -> String {
    format!(
        "CREATE OR REPLACE TABLE {qualified} ({})",
        column_list(table, dialect)
    )
}

/// `CREATE TABLE IF NOT EXISTS`
pub fn create_table_if_not_exists(table: &TableDef, qualified: &str, dialect: Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {qualified} ({})",
        column_list(table, dialect)
    )
}

/// Multi-row `INSERT` with one `?` placeholder per value
pub fn insert_rows(table: &TableDef, qualified: &str, row_count: usize) -> String {
    let placeholders = vec!["?"; table.columns.len()].join(", ");
    let tuples = vec![format!("({placeholders})"); row_count].join(", ");
    format!(
        "INSERT INTO {qualified} ({}) VALUES {tuples}",
        table.column_names().join(", ")
    )
}

/// `SELECT COUNT(*)`
pub fn row_count(qualified: &str) -> String {
    format!("SELECT COUNT(*) FROM {qualified}")
}

/// Timestamp literal accepted by `MODIFIED_AFTER`
pub fn timestamp_literal(ts: &DateTime<Utc>) -> String {
    quote_literal(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Snowflake `COPY INTO` from a named stage
pub fn copy_into(request: &CopyRequest, qualified: &str) -> String {
    let mut sql = format!("COPY INTO {qualified} FROM @{}", request.stage);

    if let Some(ref files) = request.files {
        let list = files
            .iter()
            .map(|f| quote_literal(f))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" FILES = ({list})"));
    }

    sql.push_str(
        " FILE_FORMAT = (TYPE = 'CSV' FIELD_DELIMITER = ',' SKIP_HEADER = 1 \
         FIELD_OPTIONALLY_ENCLOSED_BY = '\"')",
    );

    if let Some(ref after) = request.modified_after {
        sql.push_str(&format!(" MODIFIED_AFTER = {}", timestamp_literal(after)));
    }
    if request.force {
        sql.push_str(" FORCE = TRUE");
    }

    sql
}

/// Latest recorded load time of a table from the account load history
///
/// Binds: table name, schema name (both upper-cased).
pub fn load_checkpoint(database: &str) -> String {
    format!(
        "SELECT MAX(LAST_LOAD_TIME) FROM {database}.INFORMATION_SCHEMA.LOAD_HISTORY \
         WHERE TABLE_NAME = ? AND SCHEMA_NAME = ?"
    )
}
