//! Tests for credential resolution

use super::*;
use crate::config::CredentialsConfig;
use crate::error::{Error, ErrorKind};
use crate::types::CredentialSource;
use std::collections::HashMap;
use std::sync::Arc;

fn sample_bundle() -> CredentialBundle {
    CredentialBundle {
        user: "etl_user".to_string(),
        password: "hunter2".to_string(),
        account: "xy12345.us-east-1".to_string(),
        warehouse: "COMPUTE_WH".to_string(),
        database: "ANALYTICS".to_string(),
        schema: "PUBLIC".to_string(),
    }
}

fn secrets_config(name: Option<&str>) -> CredentialsConfig {
    CredentialsConfig {
        source: CredentialSource::SecretsManager,
        secret_name: name.map(ToString::to_string),
    }
}

const ORIGINAL_LAYOUT: &str = r#"{
    "SNOWFLAKE_USER": "etl_user",
    "SNOWFLAKE_PASSWORD": "hunter2",
    "SNOWFLAKE_ACCOUNT": "xy12345.us-east-1",
    "SNOWFLAKE_WAREHOUSE": "COMPUTE_WH",
    "SNOWFLAKE_DATABASE": "ANALYTICS",
    "SNOWFLAKE_SCHEMA": "PUBLIC"
}"#;

// ============================================================================
// CredentialBundle
// ============================================================================

#[test]
fn test_debug_redacts_password() {
    let debug = format!("{:?}", sample_bundle());
    assert!(debug.contains("etl_user"));
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("<redacted>"));
}

#[test]
fn test_secret_json_prefixed_layout() {
    let bundle = CredentialBundle::from_secret_json("creds", ORIGINAL_LAYOUT).unwrap();
    assert_eq!(bundle, sample_bundle());
}

#[test]
fn test_secret_json_plain_layout() {
    let payload = r#"{"user":"etl_user","password":"hunter2","account":"xy12345.us-east-1",
        "warehouse":"COMPUTE_WH","database":"ANALYTICS","schema":"PUBLIC"}"#;
    let bundle = CredentialBundle::from_secret_json("creds", payload).unwrap();
    assert_eq!(bundle, sample_bundle());
}

#[test]
fn test_secret_json_missing_keys_are_named() {
    let payload = r#"{"SNOWFLAKE_USER":"u","SNOWFLAKE_PASSWORD":"p","SNOWFLAKE_ACCOUNT":"a"}"#;
    let err = CredentialBundle::from_secret_json("creds", payload).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("warehouse, database, schema"));
    assert!(!message.contains("\"p\""));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_secret_json_not_json() {
    let err = CredentialBundle::from_secret_json("creds", "user=etl").unwrap_err();
    assert!(matches!(err, Error::SecretPayload { .. }));
}

#[test]
fn test_secret_json_not_an_object() {
    let err = CredentialBundle::from_secret_json("creds", r#"["a","b"]"#).unwrap_err();
    assert!(err.to_string().contains("not a JSON object"));
}

#[test]
fn test_blank_values_count_as_missing() {
    let payload = ORIGINAL_LAYOUT.replace("\"PUBLIC\"", "\"  \"");
    let err = CredentialBundle::from_secret_json("creds", &payload).unwrap_err();
    assert!(err.to_string().contains("schema"));
}

// ============================================================================
// CredentialProvider
// ============================================================================

#[tokio::test]
async fn test_resolve_from_environment() {
    let config = CredentialsConfig {
        source: CredentialSource::Environment,
        secret_name: None,
    };
    let provider = CredentialProvider::new(&config, env_from_bundle(&sample_bundle()), None);
    let bundle = provider.resolve().await.unwrap();
    assert_eq!(bundle, sample_bundle());
}

#[tokio::test]
async fn test_resolve_from_environment_missing_variable() {
    let config = CredentialsConfig {
        source: CredentialSource::Environment,
        secret_name: None,
    };
    let mut env = env_from_bundle(&sample_bundle());
    env.remove("SNOWFLAKE_PASSWORD");
    let provider = CredentialProvider::new(&config, env, None);

    let err = provider.resolve().await.unwrap_err();
    assert!(err.to_string().contains("password"));
}

#[tokio::test]
async fn test_resolve_from_secret_reads_once() {
    let store = Arc::new(StaticSecretStore::new().with_secret("creds", ORIGINAL_LAYOUT));
    let provider = CredentialProvider::new(
        &secrets_config(Some("creds")),
        HashMap::new(),
        Some(store.clone()),
    );

    let bundle = provider.resolve().await.unwrap();
    assert_eq!(bundle.database, "ANALYTICS");
    assert_eq!(store.reads(), 1);

    // No caching between resolutions
    provider.resolve().await.unwrap();
    assert_eq!(store.reads(), 2);
}

#[tokio::test]
async fn test_missing_secret_is_configuration_error() {
    let store = Arc::new(StaticSecretStore::new());
    let provider = CredentialProvider::new(
        &secrets_config(Some("absent")),
        HashMap::new(),
        Some(store.clone()),
    );

    let err = provider.resolve().await.unwrap_err();
    assert!(matches!(err, Error::SecretNotFound { ref name } if name == "absent"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_unset_secret_name_never_reads_store() {
    let store = Arc::new(StaticSecretStore::new().with_secret("creds", ORIGINAL_LAYOUT));
    let provider = CredentialProvider::new(
        &secrets_config(Some("   ")),
        HashMap::new(),
        Some(store.clone()),
    );

    let err = provider.resolve().await.unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_provider_debug_hides_env_values() {
    let config = CredentialsConfig {
        source: CredentialSource::Environment,
        secret_name: None,
    };
    let provider = CredentialProvider::new(&config, env_from_bundle(&sample_bundle()), None);
    let debug = format!("{provider:?}");
    assert!(debug.contains("SNOWFLAKE_PASSWORD"));
    assert!(!debug.contains("hunter2"));
}
