//! Snowflake over its REST session protocol
//!
//! A session is opened with a login request, statements run synchronously
//! through the query endpoint with positional bindings, and the session is
//! deleted on close.

use super::sql::{self, Dialect};
use super::traits::{Warehouse, WarehouseConnector};
use super::types::{CopiedFile, CopyOutcome, CopyRequest, Row, SqlValue, TableDef, TableName};
use crate::credentials::CredentialBundle;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const CLIENT_APP_ID: &str = "s3-warehouse-etl";

/// Rows per `INSERT` statement; Snowflake caps a `VALUES` clause at 16,384 rows
pub const DEFAULT_INSERT_BATCH_ROWS: usize = 1000;

// ============================================================================
// Connector
// ============================================================================

/// Opens Snowflake sessions
#[derive(Debug, Clone)]
pub struct SnowflakeConnector {
    base_url: Option<String>,
    timeout: Duration,
    insert_batch_rows: usize,
}

impl SnowflakeConnector {
    /// Create a connector
    ///
    /// Without a base URL the account URL `https://<account>.snowflakecomputing.com`
    /// is used.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url,
            timeout,
            insert_batch_rows: DEFAULT_INSERT_BATCH_ROWS,
        }
    }

    /// Split inserts into statements of at most `rows` rows
    pub fn with_insert_batch_rows(mut self, rows: usize) -> Self {
        self.insert_batch_rows = rows.max(1);
        self
    }

    fn base_url_for(&self, account: &str) -> String {
        self.base_url.as_ref().map_or_else(
            || format!("https://{account}.snowflakecomputing.com"),
            |url| url.trim_end_matches('/').to_string(),
        )
    }
}

#[async_trait]
impl WarehouseConnector for SnowflakeConnector {
    async fn connect(&self, credentials: &CredentialBundle) -> Result<Box<dyn Warehouse>> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(format!("{CLIENT_APP_ID}/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::warehouse(format!("Failed to create HTTP client: {e}")))?;

        let mut warehouse =
            SnowflakeWarehouse::login(client, self.base_url_for(&credentials.account), credentials)
                .await?;
        warehouse.insert_batch_rows = self.insert_batch_rows;
        Ok(Box::new(warehouse))
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Envelope of every Snowflake REST response
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

/// Rows returned by a statement, as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    fn from_data(data: QueryData) -> Self {
        let columns = data.rowtype.into_iter().map(|r| r.name).collect();
        let rows = data
            .rowset
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        Self { columns, rows }
    }

    /// Index of a column, case-insensitive
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// First cell of the first row
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Session
// ============================================================================

/// An authenticated Snowflake session
pub struct SnowflakeWarehouse {
    client: Client,
    base_url: String,
    token: Option<String>,
    database: String,
    schema: String,
    sequence: u64,
    insert_batch_rows: usize,
}

impl SnowflakeWarehouse {
    /// Log in and open a session
    pub async fn login(
        client: Client,
        base_url: String,
        credentials: &CredentialBundle,
    ) -> Result<Self> {
        let account_name = credentials
            .account
            .split('.')
            .next()
            .unwrap_or(&credentials.account);

        let body = json!({
            "data": {
                "CLIENT_APP_ID": CLIENT_APP_ID,
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
                "ACCOUNT_NAME": account_name,
                "LOGIN_NAME": credentials.user,
                "PASSWORD": credentials.password,
            }
        });

        debug!(
            base_url = %base_url,
            account = %credentials.account,
            "Logging in to Snowflake"
        );
        let response = client
            .post(format!("{base_url}/session/v1/login-request"))
            .query(&[
                ("warehouse", credentials.warehouse.as_str()),
                ("databaseName", credentials.database.as_str()),
                ("schemaName", credentials.schema.as_str()),
            ])
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let data: Option<LoginData> = read_envelope(response).await?;
        let token = data
            .and_then(|d| d.token)
            .ok_or_else(|| Error::warehouse("Login response has no session token"))?;

        info!(account = %credentials.account, "Opened Snowflake session");
        Ok(Self {
            client,
            base_url,
            token: Some(token),
            database: credentials.database.clone(),
            schema: credentials.schema.clone(),
            sequence: 0,
            insert_batch_rows: DEFAULT_INSERT_BATCH_ROWS,
        })
    }

    /// Run one statement with positional bindings
    pub async fn query(&mut self, sql_text: &str, bindings: &[SqlValue]) -> Result<QueryResult> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| Error::warehouse("Session is closed"))?;

        self.sequence += 1;
        let mut body = json!({
            "sqlText": sql_text,
            "asyncExec": false,
            "sequenceId": self.sequence,
        });
        if !bindings.is_empty() {
            body["bindings"] = Value::Object(bind_map(bindings));
        }

        debug!(sql = %sql_text, bindings = bindings.len(), "Executing statement");
        let response = self
            .client
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", request_id(self.sequence))])
            .header("Accept", "application/json")
            .header("Authorization", format!("Snowflake Token=\"{token}\""))
            .json(&body)
            .send()
            .await?;

        let data: Option<QueryData> = read_envelope(response).await?;
        Ok(QueryResult::from_data(data.unwrap_or_default()))
    }

    fn qualify(&self, table: &TableName) -> String {
        table.qualified(&self.database, &self.schema)
    }

    async fn execute(&mut self, sql_text: &str) -> Result<QueryResult> {
        self.query(sql_text, &[]).await
    }
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    fn backend(&self) -> &'static str {
        "snowflake"
    }

    async fn create_or_replace_table(&mut self, table: &TableDef) -> Result<()> {
        let stmt =
            sql::create_or_replace_table(table, &self.qualify(&table.name), Dialect::Snowflake);
        self.execute(&stmt).await?;
        Ok(())
    }

    async fn create_table_if_not_exists(&mut self, table: &TableDef) -> Result<()> {
        let stmt =
            sql::create_table_if_not_exists(table, &self.qualify(&table.name), Dialect::Snowflake);
        self.execute(&stmt).await?;
        Ok(())
    }

    async fn insert_rows(&mut self, table: &TableDef, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let qualified = self.qualify(&table.name);
        let mut inserted = 0;

        // All batches share one transaction
        self.execute("BEGIN").await?;
        for batch in rows.chunks(self.insert_batch_rows) {
            let stmt = sql::insert_rows(table, &qualified, batch.len());
            let values: Vec<SqlValue> = batch.iter().flatten().cloned().collect();

            match self.query(&stmt, &values).await {
                Ok(result) => {
                    inserted += result
                        .scalar()
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(batch.len() as u64);
                }
                Err(e) => {
                    if let Err(rollback) = self.execute("ROLLBACK").await {
                        warn!(error = %rollback, "Rollback failed");
                    }
                    return Err(Error::load(table.name.to_string(), e.to_string()));
                }
            }
        }
        self.execute("COMMIT").await?;

        Ok(inserted)
    }

    async fn copy_from_stage(&mut self, request: &CopyRequest) -> Result<CopyOutcome> {
        let stmt = sql::copy_into(request, &self.qualify(&request.table));
        let result = self.execute(&stmt).await?;
        Ok(copy_outcome(&result))
    }

    async fn load_checkpoint(&mut self, table: &TableName) -> Result<Option<DateTime<Utc>>> {
        let database = table.database.clone().unwrap_or_else(|| self.database.clone());
        let schema = table.schema.clone().unwrap_or_else(|| self.schema.clone());
        let bindings = [
            SqlValue::Text(table.name.to_uppercase()),
            SqlValue::Text(schema.to_uppercase()),
        ];

        let result = self.query(&sql::load_checkpoint(&database), &bindings).await?;
        match result.scalar() {
            None => Ok(None),
            Some(raw) => parse_timestamp(raw)
                .map(Some)
                .ok_or_else(|| Error::warehouse(format!("Unrecognized load time '{raw}'"))),
        }
    }

    async fn row_count(&mut self, table: &TableName) -> Result<u64> {
        let result = self.execute(&sql::row_count(&self.qualify(table))).await?;
        result
            .scalar()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| Error::warehouse("COUNT(*) returned no value"))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .query(&[("delete", "true")])
            .header("Accept", "application/json")
            .header("Authorization", format!("Snowflake Token=\"{token}\""))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::warehouse_status(status.as_u16(), body));
        }

        debug!("Closed Snowflake session");
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Check the HTTP status and the `success` flag, then return `data`
async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<Option<T>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(Error::warehouse_status(status.as_u16(), body));
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)
        .map_err(|e| Error::warehouse(format!("Malformed response: {e}")))?;

    if !envelope.success {
        let code = envelope
            .code
            .map(|c| c.as_str().map_or_else(|| c.to_string(), ToString::to_string))
            .unwrap_or_default();
        let message = envelope.message.unwrap_or_else(|| "request failed".to_string());
        return Err(Error::warehouse(if code.is_empty() {
            message
        } else {
            format!("{code}: {message}")
        }));
    }

    Ok(envelope.data)
}

/// Positional bindings keyed `"1"`, `"2"`, ...
fn bind_map(values: &[SqlValue]) -> Map<String, Value> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| ((i + 1).to_string(), binding(v)))
        .collect()
}

fn binding(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => json!({"type": "TEXT", "value": null}),
        SqlValue::Text(s) => json!({"type": "TEXT", "value": s}),
        SqlValue::Integer(i) => json!({"type": "FIXED", "value": i.to_string()}),
        SqlValue::Timestamp(ts) => {
            let utc = ts.and_utc();
            let nanos = utc
                .timestamp_nanos_opt()
                .map_or_else(|| format!("{}000", utc.timestamp_micros()), |n| n.to_string());
            json!({"type": "TIMESTAMP_NTZ", "value": nanos})
        }
    }
}

/// UUID-shaped request id, unique per session statement
fn request_id(sequence: u64) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let hex = format!("{:032x}", nanos ^ (u128::from(sequence) << 96));
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Parse a timestamp cell: epoch `seconds[.fraction] [tz]` or RFC 3339
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let token = raw.split_whitespace().next()?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(token) {
        return Some(ts.with_timezone(&Utc));
    }

    let (secs, frac) = token.split_once('.').unwrap_or((token, ""));
    let secs: i64 = secs.parse().ok()?;
    let mut frac: String = frac.chars().take(9).collect();
    while frac.len() < 9 {
        frac.push('0');
    }
    let nanos: u32 = frac.parse().ok()?;
    DateTime::from_timestamp(secs, nanos)
}

/// Collect per-file results of a `COPY INTO`
///
/// A copy with nothing to load returns a single status row without the
/// per-file columns.
fn copy_outcome(result: &QueryResult) -> CopyOutcome {
    let (Some(file_idx), Some(rows_idx)) = (result.column("file"), result.column("rows_loaded"))
    else {
        return CopyOutcome::default();
    };
    let status_idx = result.column("status");

    let cell = |row: &Vec<Option<String>>, idx: usize| row.get(idx).cloned().flatten();
    let files = result
        .rows
        .iter()
        .map(|row| CopiedFile {
            file: cell(row, file_idx).unwrap_or_default(),
            status: status_idx
                .and_then(|i| cell(row, i))
                .unwrap_or_default(),
            rows_loaded: cell(row, rows_idx)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        })
        .collect();

    CopyOutcome { files }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_epoch() {
        let ts = parse_timestamp("1700000000.123000000").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 123);

        let ts = parse_timestamp("1700000000.5 1440").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 500);

        assert_eq!(
            parse_timestamp("1700000000").unwrap(),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let ts = parse_timestamp("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_bindings_are_positional() {
        let load_time = Utc.timestamp_opt(1, 500).unwrap().naive_utc();
        let map = bind_map(&[
            SqlValue::from("Alice"),
            SqlValue::Integer(30),
            SqlValue::Null,
            SqlValue::Timestamp(load_time),
        ]);
        assert_eq!(map["1"], json!({"type": "TEXT", "value": "Alice"}));
        assert_eq!(map["2"], json!({"type": "FIXED", "value": "30"}));
        assert_eq!(map["3"], json!({"type": "TEXT", "value": null}));
        assert_eq!(
            map["4"],
            json!({"type": "TIMESTAMP_NTZ", "value": "1000000500"})
        );
    }

    #[test]
    fn test_request_id_shape() {
        let id = request_id(7);
        let groups: Vec<usize> = id.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
    }

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells.iter().map(|c| Some((*c).to_string())).collect()
    }

    #[test]
    fn test_copy_outcome_parsing() {
        let result = QueryResult {
            columns: vec![
                "file".into(),
                "status".into(),
                "rows_parsed".into(),
                "rows_loaded".into(),
            ],
            rows: vec![
                row(&["s3://b/a.csv", "LOADED", "2", "2"]),
                row(&["s3://b/b.csv", "LOADED", "3", "3"]),
            ],
        };
        let outcome = copy_outcome(&result);
        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.rows_loaded(), 5);

        let nothing = QueryResult {
            columns: vec!["status".into()],
            rows: vec![vec![Some("Copy executed with 0 files processed.".into())]],
        };
        assert_eq!(copy_outcome(&nothing).rows_loaded(), 0);
    }
}
