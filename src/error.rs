//! Error types for the ETL pipeline
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Every variant maps onto one [`ErrorKind`], which is what the invocation
//! response reports back to the caller.

use serde::Serialize;
use thiserror::Error;

/// The main error type for the pipeline
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Credential Errors
    // ============================================================================
    #[error("Secret '{name}' not found")]
    SecretNotFound { name: String },

    #[error("Secret '{name}' is malformed: {message}")]
    SecretPayload { name: String, message: String },

    #[error("Secrets store error: {message}")]
    SecretsStore { message: String },

    // ============================================================================
    // Extraction Errors
    // ============================================================================
    #[error("Object not found: {location}")]
    ObjectNotFound { location: String },

    #[error("Failed to extract {location}: {message}")]
    Extraction { location: String, message: String },

    #[error("Invalid event notification: {message}")]
    InvalidEvent { message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Load Errors
    // ============================================================================
    #[error("Warehouse error: {message}")]
    Warehouse { message: String },

    #[error("Warehouse HTTP {status}: {body}")]
    WarehouseStatus { status: u16, body: String },

    #[error("Failed to load into {table}: {message}")]
    Load { table: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    // ============================================================================
    // Trigger Errors
    // ============================================================================
    #[error("Transformation trigger '{command}' failed: {message}")]
    TransformTrigger { command: String, message: String },

    #[error("Invoking function '{function}' failed: {message}")]
    LoadTrigger { function: String, message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Category of a failure, as reported in invocation responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid credentials or environment
    Configuration,
    /// Unreadable or malformed input file
    Extraction,
    /// Warehouse connectivity or SQL failure
    Load,
    /// External transformation tool failure
    TransformTrigger,
    /// Programmatic function invocation failure
    LoadTrigger,
    /// Anything else
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Load => "load",
            ErrorKind::TransformTrigger => "transform_trigger",
            ErrorKind::LoadTrigger => "load_trigger",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a malformed secret error
    pub fn secret_payload(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SecretPayload {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an invalid event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Create a warehouse error
    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::Warehouse {
            message: message.into(),
        }
    }

    /// Create a warehouse HTTP status error
    pub fn warehouse_status(status: u16, body: impl Into<String>) -> Self {
        Self::WarehouseStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a load error for a table
    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a transformation trigger error
    pub fn transform_trigger(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransformTrigger {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a load trigger error
    pub fn load_trigger(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadTrigger {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Classify this error into the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::SecretNotFound { .. }
            | Error::SecretPayload { .. }
            | Error::SecretsStore { .. } => ErrorKind::Configuration,

            Error::ObjectNotFound { .. }
            | Error::Extraction { .. }
            | Error::InvalidEvent { .. }
            | Error::ObjectStore(_) => ErrorKind::Extraction,

            Error::Warehouse { .. }
            | Error::WarehouseStatus { .. }
            | Error::Load { .. }
            | Error::Http(_)
            | Error::DuckDb(_) => ErrorKind::Load,

            Error::TransformTrigger { .. } => ErrorKind::TransformTrigger,
            Error::LoadTrigger { .. } => ErrorKind::LoadTrigger,

            Error::JsonParse(_) | Error::Io(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, Error>;
