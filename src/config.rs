//! Pipeline configuration
//!
//! All settings live in one immutable [`PipelineConfig`] that is built once at
//! startup and passed into every component. Values are layered:
//! defaults, then an optional YAML file, then environment overrides.
//! Every field is defaulted so an empty YAML document is a valid config.

use crate::error::{Error, Result};
use crate::types::{
    CopyScope, CredentialSource, InvocationMode, LoadStrategy, StorageBackend,
    TriggerFailurePolicy, WarehouseBackend,
};
use crate::warehouse::TableName;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a YAML config file
pub const CONFIG_PATH_ENV: &str = "ETL_CONFIG";

/// Environment variable naming the credentials secret
pub const SECRET_NAME_ENV: &str = "SNOWFLAKE_SECRET_NAME";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Credential resolution
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Object storage access
    #[serde(default)]
    pub storage: StorageConfig,

    /// CSV extraction
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Warehouse connection and target tables
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Load strategy
    #[serde(default)]
    pub load: LoadConfig,

    /// Downstream transformation tool
    #[serde(default)]
    pub transform_trigger: TransformTriggerConfig,

    /// Seed utility
    #[serde(default)]
    pub seed: SeedConfig,
}

// ============================================================================
// Credentials
// ============================================================================

/// Where warehouse credentials come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Credential source
    #[serde(default)]
    pub source: CredentialSource,

    /// Secret identifier (secrets_manager source)
    #[serde(default = "default_secret_name")]
    pub secret_name: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::default(),
            secret_name: default_secret_name(),
        }
    }
}

fn default_secret_name() -> Option<String> {
    Some("snowflake_credentials".to_string())
}

// ============================================================================
// Storage
// ============================================================================

/// Object storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// AWS region override (S3)
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint (MinIO, LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Allow plain HTTP to the endpoint
    #[serde(default)]
    pub allow_http: bool,

    /// Root directory for the local backend
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

// ============================================================================
// Extract
// ============================================================================

/// CSV extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Columns that must be present in the header
    #[serde(default = "default_expected_columns")]
    pub expected_columns: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            expected_columns: default_expected_columns(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_expected_columns() -> Vec<String> {
    ["first", "last", "age", "sex"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// Warehouse
// ============================================================================

/// Warehouse settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse backend
    #[serde(default)]
    pub backend: WarehouseBackend,

    /// Override for the Snowflake base URL (defaults to the account URL)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,

    /// DuckDB database path (duckdb backend)
    #[serde(default = "default_duckdb_path")]
    pub duckdb_path: String,

    /// Table receiving transformed rows (direct insert)
    #[serde(default = "default_target_table")]
    pub target_table: String,

    /// Table receiving bulk copies (staged copy)
    #[serde(default = "default_raw_table")]
    pub raw_table: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::default(),
            base_url: None,
            request_timeout_seconds: default_timeout(),
            duckdb_path: default_duckdb_path(),
            target_table: default_target_table(),
            raw_table: default_raw_table(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_duckdb_path() -> String {
    ":memory:".to_string()
}

fn default_target_table() -> String {
    "employees".to_string()
}

fn default_raw_table() -> String {
    "raw_employees".to_string()
}

// ============================================================================
// Load
// ============================================================================

/// Load strategy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Direct insert or staged copy
    #[serde(default)]
    pub strategy: LoadStrategy,

    /// Stage name (without the leading `@`)
    #[serde(default = "default_stage")]
    pub stage: String,

    /// External location the stage points at, e.g. `s3://bucket/prefix`
    /// (used by backends that emulate stages)
    #[serde(default)]
    pub stage_url: Option<String>,

    /// Single event file or every staged file
    #[serde(default)]
    pub copy_scope: CopyScope,

    /// Reload files that were already loaded
    #[serde(default)]
    pub force: bool,

    /// Only copy files modified after the last recorded load
    #[serde(default)]
    pub incremental: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            strategy: LoadStrategy::default(),
            stage: default_stage(),
            stage_url: None,
            copy_scope: CopyScope::default(),
            force: false,
            incremental: false,
        }
    }
}

fn default_stage() -> String {
    "employee_stage".to_string()
}

// ============================================================================
// Transformation Trigger
// ============================================================================

/// External transformation tool run after a successful load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformTriggerConfig {
    /// Whether to run the tool at all
    #[serde(default)]
    pub enabled: bool,

    /// Program to execute
    #[serde(default = "default_program")]
    pub program: String,

    /// Program arguments
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Working directory (e.g. the dbt project)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Effect of a failed run on the invocation
    #[serde(default)]
    pub on_failure: TriggerFailurePolicy,
}

impl Default for TransformTriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: default_program(),
            args: default_args(),
            working_dir: None,
            on_failure: TriggerFailurePolicy::default(),
        }
    }
}

fn default_program() -> String {
    "dbt".to_string()
}

fn default_args() -> Vec<String> {
    vec!["run".to_string()]
}

// ============================================================================
// Seed
// ============================================================================

/// Seed utility settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Bucket receiving seed files
    #[serde(default = "default_seed_bucket")]
    pub bucket: String,

    /// Object key prefix
    #[serde(default = "default_seed_prefix")]
    pub prefix: String,

    /// Function to invoke after upload
    #[serde(default)]
    pub function_name: Option<String>,

    /// Invocation type for the function
    #[serde(default)]
    pub invocation: InvocationMode,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            bucket: default_seed_bucket(),
            prefix: default_seed_prefix(),
            function_name: None,
            invocation: InvocationMode::default(),
        }
    }
}

fn default_seed_bucket() -> String {
    "s3-sfbucket".to_string()
}

fn default_seed_prefix() -> String {
    "employee_".to_string()
}

// ============================================================================
// Loading
// ============================================================================

impl PipelineConfig {
    /// Parse a config from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load the effective config for this process: optional file (explicit
    /// path or `ETL_CONFIG`), then process environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ETL_CREDENTIAL_SOURCE") {
            self.credentials.source = parse_enum("ETL_CREDENTIAL_SOURCE", &v)?;
        }
        if let Some(v) = get(SECRET_NAME_ENV) {
            self.credentials.secret_name = Some(v);
        }
        if let Some(v) = get("ETL_STORAGE_BACKEND") {
            self.storage.backend = parse_enum("ETL_STORAGE_BACKEND", &v)?;
        }
        if let Some(v) = get("ETL_LOCAL_STORAGE_ROOT") {
            self.storage.local_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("ETL_WAREHOUSE_BACKEND") {
            self.warehouse.backend = parse_enum("ETL_WAREHOUSE_BACKEND", &v)?;
        }
        if let Some(v) = get("ETL_DUCKDB_PATH") {
            self.warehouse.duckdb_path = v;
        }
        if let Some(v) = get("ETL_TARGET_TABLE") {
            self.warehouse.target_table = v;
        }
        if let Some(v) = get("ETL_RAW_TABLE") {
            self.warehouse.raw_table = v;
        }
        if let Some(v) = get("ETL_LOAD_STRATEGY") {
            self.load.strategy = parse_enum("ETL_LOAD_STRATEGY", &v)?;
        }
        if let Some(v) = get("ETL_STAGE") {
            self.load.stage = v.trim_start_matches('@').to_string();
        }
        if let Some(v) = get("ETL_STAGE_URL") {
            self.load.stage_url = Some(v);
        }
        if let Some(v) = get("ETL_COPY_SCOPE") {
            self.load.copy_scope = parse_enum("ETL_COPY_SCOPE", &v)?;
        }
        if let Some(v) = get("ETL_COPY_FORCE") {
            self.load.force = parse_bool("ETL_COPY_FORCE", &v)?;
        }
        if let Some(v) = get("ETL_COPY_INCREMENTAL") {
            self.load.incremental = parse_bool("ETL_COPY_INCREMENTAL", &v)?;
        }
        if let Some(v) = get("ETL_TRANSFORM_ENABLED") {
            self.transform_trigger.enabled = parse_bool("ETL_TRANSFORM_ENABLED", &v)?;
        }
        if let Some(v) = get("ETL_TRANSFORM_COMMAND") {
            let mut parts = v.split_whitespace().map(ToString::to_string);
            if let Some(program) = parts.next() {
                self.transform_trigger.program = program;
                self.transform_trigger.args = parts.collect();
            }
        }
        if let Some(v) = get("ETL_TRANSFORM_DIR") {
            self.transform_trigger.working_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("ETL_TRANSFORM_ON_FAILURE") {
            self.transform_trigger.on_failure = parse_enum("ETL_TRANSFORM_ON_FAILURE", &v)?;
        }
        if let Some(v) = get("ETL_SEED_BUCKET") {
            self.seed.bucket = v;
        }
        if let Some(v) = get("ETL_SEED_PREFIX") {
            self.seed.prefix = v;
        }
        if let Some(v) = get("ETL_FUNCTION_NAME") {
            self.seed.function_name = Some(v);
        }

        Ok(self)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<()> {
        TableName::parse(&self.warehouse.target_table)
            .map_err(|e| Error::invalid_value("warehouse.target_table", e.to_string()))?;
        TableName::parse(&self.warehouse.raw_table)
            .map_err(|e| Error::invalid_value("warehouse.raw_table", e.to_string()))?;

        if self.extract.expected_columns.is_empty() {
            return Err(Error::invalid_value(
                "extract.expected_columns",
                "at least one column is required",
            ));
        }

        if self.load.strategy == LoadStrategy::StagedCopy {
            if self.load.stage.trim().is_empty() {
                return Err(Error::missing_field("load.stage"));
            }
            if !self
                .load
                .stage
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '$'))
            {
                return Err(Error::invalid_value(
                    "load.stage",
                    format!("'{}' is not a valid stage reference", self.load.stage),
                ));
            }
            if self.load.force && self.load.incremental {
                return Err(Error::invalid_value(
                    "load.force",
                    "force and incremental copies are mutually exclusive",
                ));
            }
            if self.warehouse.backend == WarehouseBackend::Duckdb && self.load.stage_url.is_none()
            {
                return Err(Error::missing_field("load.stage_url"));
            }
        }

        if self.storage.backend == StorageBackend::Local && self.storage.local_root.is_none() {
            return Err(Error::missing_field("storage.local_root"));
        }

        if self.transform_trigger.enabled && self.transform_trigger.program.trim().is_empty() {
            return Err(Error::missing_field("transform_trigger.program"));
        }

        Ok(())
    }
}

/// Parse a snake_case enum value from an environment string
fn parse_enum<T: DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|e| Error::invalid_value(key, format!("'{value}': {e}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_value(key, format!("'{value}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = PipelineConfig::from_yaml_str("").unwrap();
        assert_eq!(config.warehouse.target_table, "employees");
        assert_eq!(config.warehouse.raw_table, "raw_employees");
        assert_eq!(
            config.credentials.secret_name.as_deref(),
            Some("snowflake_credentials")
        );
        assert_eq!(config.extract.expected_columns, vec!["first", "last", "age", "sex"]);
        assert!(!config.transform_trigger.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_yaml_is_configuration_error() {
        let err = PipelineConfig::from_yaml_str("load: [unterminated").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);

        let err = PipelineConfig::from_yaml_str("load:\n  strategy: upsert\n").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse YAML"));
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
credentials:
  source: environment
warehouse:
  backend: duckdb
  target_table: analytics.public.people
load:
  strategy: staged_copy
  stage: raw_stage
  stage_url: "s3://landing/incoming"
  copy_scope: all_files
  incremental: true
transform_trigger:
  enabled: true
  program: dbt
  args: [run, --select, staging]
  on_failure: fail
"#;

        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.credentials.source, CredentialSource::Environment);
        assert_eq!(config.warehouse.backend, WarehouseBackend::Duckdb);
        assert_eq!(config.warehouse.target_table, "analytics.public.people");
        assert_eq!(config.load.strategy, LoadStrategy::StagedCopy);
        assert_eq!(config.load.copy_scope, CopyScope::AllFiles);
        assert!(config.load.incremental);
        assert_eq!(config.transform_trigger.args, vec!["run", "--select", "staging"]);
        assert_eq!(config.transform_trigger.on_failure, TriggerFailurePolicy::Fail);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::default()
            .with_env_overrides(env(&[
                ("SNOWFLAKE_SECRET_NAME", "prod/snowflake"),
                ("ETL_LOAD_STRATEGY", "STAGED_COPY"),
                ("ETL_STAGE", "@my_stage"),
                ("ETL_COPY_FORCE", "true"),
                ("ETL_TRANSFORM_COMMAND", "dbt run --target prod"),
            ]))
            .unwrap();

        assert_eq!(config.credentials.secret_name.as_deref(), Some("prod/snowflake"));
        assert_eq!(config.load.strategy, LoadStrategy::StagedCopy);
        assert_eq!(config.load.stage, "my_stage");
        assert!(config.load.force);
        assert_eq!(config.transform_trigger.program, "dbt");
        assert_eq!(config.transform_trigger.args, vec!["run", "--target", "prod"]);
    }

    #[test]
    fn test_env_overrides_ignore_blank_values() {
        let config = PipelineConfig::default()
            .with_env_overrides(env(&[("SNOWFLAKE_SECRET_NAME", "  ")]))
            .unwrap();
        assert_eq!(
            config.credentials.secret_name.as_deref(),
            Some("snowflake_credentials")
        );
    }

    #[test]
    fn test_env_override_invalid_enum() {
        let err = PipelineConfig::default()
            .with_env_overrides(env(&[("ETL_LOAD_STRATEGY", "upsert")]))
            .unwrap_err();
        assert!(err.to_string().contains("ETL_LOAD_STRATEGY"));
    }

    #[test]
    fn test_env_override_invalid_bool() {
        let result = PipelineConfig::default()
            .with_env_overrides(env(&[("ETL_COPY_INCREMENTAL", "sometimes")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_table_name() {
        let mut config = PipelineConfig::default();
        config.warehouse.target_table = "employees; DROP TABLE x".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("warehouse.target_table"));
    }

    #[test]
    fn test_validate_force_and_incremental_conflict() {
        let mut config = PipelineConfig::default();
        config.load.strategy = LoadStrategy::StagedCopy;
        config.load.force = true;
        config.load.incremental = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duckdb_copy_needs_stage_url() {
        let mut config = PipelineConfig::default();
        config.load.strategy = LoadStrategy::StagedCopy;
        config.warehouse.backend = WarehouseBackend::Duckdb;
        assert!(config.validate().is_err());

        config.load.stage_url = Some("s3://landing".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_local_storage_needs_root() {
        let mut config = PipelineConfig::default();
        config.storage.backend = StorageBackend::Local;
        assert!(config.validate().is_err());
    }
}
