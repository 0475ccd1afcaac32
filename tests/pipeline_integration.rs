//! End-to-end tests over local object storage and an on-disk DuckDB database
//!
//! Seeds files the way the seed command does, then runs them through the same
//! pipeline the function handler uses.

use chrono::{TimeZone, Utc};
use lambda_runtime::{Context, LambdaEvent};
use pretty_assertions::assert_eq;
use s3_warehouse_etl::config::PipelineConfig;
use s3_warehouse_etl::credentials::{env_from_bundle, CredentialBundle, CredentialProvider};
use s3_warehouse_etl::extract::{Extractor, NotificationEvent};
use s3_warehouse_etl::load::Loader;
use s3_warehouse_etl::pipeline::{Pipeline, Stage};
use s3_warehouse_etl::seed::{SeedVariant, Seeder};
use s3_warehouse_etl::storage::{build_store_provider, ObjectLocation, ObjectStorage};
use s3_warehouse_etl::transform::{FixedClock, Transformer};
use s3_warehouse_etl::trigger::TransformTrigger;
use s3_warehouse_etl::warehouse::{build_connector, TableName};
use s3_warehouse_etl::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn bundle() -> CredentialBundle {
    CredentialBundle {
        user: "etl".to_string(),
        password: "pw".to_string(),
        account: "local".to_string(),
        warehouse: "compute_wh".to_string(),
        database: "employee_db".to_string(),
        schema: "employee".to_string(),
    }
}

fn config(dir: &Path, extra: &str) -> PipelineConfig {
    let yaml = format!(
        r#"
credentials:
  source: environment
storage:
  backend: local
  local_root: "{root}"
warehouse:
  backend: duckdb
  duckdb_path: "{db}"
{extra}
"#,
        root = dir.join("buckets").display(),
        db = dir.join("warehouse.duckdb").display(),
    );
    let config = PipelineConfig::from_yaml_str(&yaml).unwrap();
    config.validate().unwrap();
    config
}

fn storage(config: &PipelineConfig) -> ObjectStorage {
    ObjectStorage::new(build_store_provider(&config.storage).unwrap())
}

fn pipeline(config: &PipelineConfig) -> Pipeline {
    let storage = storage(config);
    Pipeline::new(
        CredentialProvider::new(&config.credentials, env_from_bundle(&bundle()), None),
        Extractor::new(storage.clone(), &config.extract).unwrap(),
        Transformer::new(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ))),
        Loader::from_config(config).unwrap(),
        build_connector(config, &storage).unwrap(),
        TransformTrigger::disabled(),
    )
}

async fn seed_at(config: &PipelineConfig, second: u32) -> ObjectLocation {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, second).unwrap());
    let outcome = Seeder::new(storage(config), &config.seed, Arc::new(clock))
        .upload(SeedVariant::People)
        .await
        .unwrap();
    ObjectLocation::parse(&outcome.location).unwrap()
}

async fn row_count(pipeline: &Pipeline, table: &str) -> u64 {
    let mut session = pipeline.connector().connect(&bundle()).await.unwrap();
    let count = session
        .row_count(&TableName::parse(table).unwrap())
        .await
        .unwrap();
    session.close().await.unwrap();
    count
}

// ============================================================================
// Direct insert
// ============================================================================

#[tokio::test]
async fn test_seed_then_direct_insert() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), "");

    let location = seed_at(&config, 0).await;
    assert_eq!(location.key, "employee_20240301_090000.csv");
    assert!(dir
        .path()
        .join("buckets/s3-sfbucket/employee_20240301_090000.csv")
        .exists());

    let pipeline = pipeline(&config);
    let report = pipeline
        .handle_event(&NotificationEvent::for_objects([&location]))
        .await;

    assert!(report.is_success(), "{:?}", report.state);
    assert_eq!(
        report.transitions,
        vec![
            Stage::Received,
            Stage::Extracted,
            Stage::Transformed,
            Stage::Loaded,
            Stage::Done
        ]
    );
    assert_eq!(row_count(&pipeline, "employees").await, 2);

    // The table is recreated per load, so a second file replaces the first
    let second = seed_at(&config, 1).await;
    let response = pipeline
        .handle(&NotificationEvent::for_objects([&second]))
        .await;
    assert_eq!(response.status_code, 200);
    assert_eq!(row_count(&pipeline, "employees").await, 2);
}

#[tokio::test]
async fn test_raw_notification_through_handler() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), "");
    seed_at(&config, 0).await;

    let payload: NotificationEvent = serde_json::from_value(serde_json::json!({
        "Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": "s3-sfbucket"},
                "object": {"key": "employee_20240301_090000.csv", "size": 58}
            }
        }]
    }))
    .unwrap();

    let pipeline = pipeline(&config);
    let response = s3_warehouse_etl::handler::handle(
        &pipeline,
        LambdaEvent::new(payload, Context::default()),
    )
    .await
    .unwrap();

    assert_eq!(response.status_code, 200);
    let body = response.body_json().unwrap();
    assert_eq!(body["rows_loaded"], 2);
    assert_eq!(
        body["message"],
        "Processed and loaded s3://s3-sfbucket/employee_20240301_090000.csv into employees"
    );
}

#[tokio::test]
async fn test_missing_object_is_extraction_failure() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), "");
    let missing = ObjectLocation::new("s3-sfbucket", "nope.csv");

    let response = pipeline(&config)
        .handle(&NotificationEvent::for_objects([&missing]))
        .await;

    assert_eq!(response.status_code, 500);
    let body = response.body_json().unwrap();
    assert_eq!(body["kind"], "extraction");
    assert_eq!(body["stage"], "received");
}

#[tokio::test]
async fn test_employee_file_fails_header_check() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), "");
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    let outcome = Seeder::new(storage(&config), &config.seed, Arc::new(clock))
        .upload(SeedVariant::Employees)
        .await
        .unwrap();
    let location = ObjectLocation::parse(&outcome.location).unwrap();

    let report = pipeline(&config)
        .handle_event(&NotificationEvent::for_objects([&location]))
        .await;
    assert_eq!(report.error_kind(), Some(ErrorKind::Extraction));
}

// ============================================================================
// Staged copy
// ============================================================================

const STAGED: &str = r#"
load:
  strategy: staged_copy
  stage_url: "s3://s3-sfbucket"
  incremental: true
"#;

#[tokio::test]
async fn test_incremental_copy_skips_loaded_files() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), STAGED);
    let pipeline = pipeline(&config);

    let first = seed_at(&config, 0).await;
    let report = pipeline
        .handle_event(&NotificationEvent::for_objects([&first]))
        .await;
    assert!(report.is_success(), "{:?}", report.state);
    assert_eq!(
        report.transitions,
        vec![Stage::Received, Stage::Loaded, Stage::Done]
    );
    assert_eq!(report.rows_loaded(), 2);
    assert_eq!(report.loads[0].modified_after, None);

    // Same event again: the file is already in the load history
    let report = pipeline
        .handle_event(&NotificationEvent::for_objects([&first]))
        .await;
    assert!(report.is_success());
    assert_eq!(report.rows_loaded(), 0);
    assert!(report.loads[0].modified_after.is_some());

    assert_eq!(row_count(&pipeline, "raw_employees").await, 2);
}

#[tokio::test]
async fn test_forced_copy_of_all_files_reloads() {
    let dir = TempDir::new().unwrap();
    let config = config(
        dir.path(),
        r#"
load:
  strategy: staged_copy
  stage_url: "s3://s3-sfbucket"
  copy_scope: all_files
  force: true
"#,
    );
    let pipeline = pipeline(&config);

    let first = seed_at(&config, 0).await;
    let second = seed_at(&config, 1).await;
    let event = NotificationEvent::for_objects([&first, &second]);

    let report = pipeline.handle_event(&event).await;
    assert_eq!(report.rows_loaded(), 4);
    assert_eq!(report.loads[0].files.len(), 2);

    let report = pipeline.handle_event(&event).await;
    assert_eq!(report.rows_loaded(), 4);
    assert_eq!(row_count(&pipeline, "raw_employees").await, 8);
}
