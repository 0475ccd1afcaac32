//! Common types used throughout the pipeline
//!
//! This module contains the shared enums that select between pipeline
//! variants (credential source, load strategy, warehouse backend, ...)
//! and small utility traits used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Credential Source
// ============================================================================

/// Where warehouse credentials are resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `SNOWFLAKE_*` environment variables
    Environment,
    /// A named secret in AWS Secrets Manager
    #[default]
    SecretsManager,
}

// ============================================================================
// Warehouse Backend
// ============================================================================

/// Which warehouse implementation receives the load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseBackend {
    /// Snowflake over its REST session protocol
    #[default]
    Snowflake,
    /// Embedded DuckDB (local runs and tests)
    Duckdb,
}

// ============================================================================
// Storage Backend
// ============================================================================

/// Which object store backs bucket access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Amazon S3 (credentials from the environment)
    #[default]
    S3,
    /// Local directory, one sub-directory per bucket
    Local,
    /// Process-local in-memory store
    Memory,
}

// ============================================================================
// Load Strategy
// ============================================================================

/// How records reach the warehouse table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Recreate the table and insert transformed rows in one transaction
    #[default]
    DirectInsert,
    /// Bulk `COPY INTO` straight from the stage
    StagedCopy,
}

/// Which staged files a bulk copy considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyScope {
    /// Only the object named by the event
    #[default]
    EventFile,
    /// Every file in the stage
    AllFiles,
}

// ============================================================================
// Trigger Failure Policy
// ============================================================================

/// What a failed transformation trigger does to the invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerFailurePolicy {
    /// Log the failure; the load result stands on its own
    #[default]
    Continue,
    /// Fail the whole invocation
    Fail,
}

// ============================================================================
// Function Invocation Type
// ============================================================================

/// How the load trigger invokes the function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    /// Fire and forget (`Event`)
    #[default]
    Event,
    /// Wait for the function result (`RequestResponse`)
    RequestResponse,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty or whitespace
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(CredentialSource::default(), CredentialSource::SecretsManager);
        assert_eq!(WarehouseBackend::default(), WarehouseBackend::Snowflake);
        assert_eq!(LoadStrategy::default(), LoadStrategy::DirectInsert);
        assert_eq!(CopyScope::default(), CopyScope::EventFile);
        assert_eq!(TriggerFailurePolicy::default(), TriggerFailurePolicy::Continue);
    }

    #[test]
    fn test_load_strategy_serde() {
        let strategy: LoadStrategy = serde_json::from_str("\"staged_copy\"").unwrap();
        assert_eq!(strategy, LoadStrategy::StagedCopy);

        let json = serde_json::to_string(&LoadStrategy::DirectInsert).unwrap();
        assert_eq!(json, "\"direct_insert\"");
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some("  ".to_string()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
        assert_eq!("".to_string().none_if_empty(), None);
    }
}
