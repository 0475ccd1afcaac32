//! Tests for the extraction stage

use super::*;
use crate::config::ExtractConfig;
use crate::error::{Error, ErrorKind};
use crate::storage::{ObjectLocation, ObjectStorage};
use bytes::Bytes;
use pretty_assertions::assert_eq;

const PEOPLE_CSV: &str = "first,last,age,sex\nAlice,Brown,30,F\nCharlie,Davis,40,M\n";

async fn storage_with(key: &str, body: &'static [u8]) -> (ObjectStorage, ObjectLocation) {
    let storage = ObjectStorage::in_memory();
    let location = ObjectLocation::new("s3-sfbucket", key);
    storage
        .put(&location, Bytes::from_static(body))
        .await
        .unwrap();
    (storage, location)
}

// ============================================================================
// Notification events
// ============================================================================

#[test]
fn test_parse_notification_event() {
    let payload = serde_json::json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": "s3-sfbucket", "arn": "arn:aws:s3:::s3-sfbucket"},
                "object": {"key": "incoming/employee+data%3A1.csv", "size": 64}
            }
        }]
    });

    let event: NotificationEvent = serde_json::from_value(payload).unwrap();
    let locations = event.locations().unwrap();
    assert_eq!(
        locations,
        vec![ObjectLocation::new("s3-sfbucket", "incoming/employee data:1.csv")]
    );
    assert_eq!(event.records[0].s3.object.size, Some(64));
}

#[test]
fn test_event_without_records_is_empty() {
    let event: NotificationEvent = serde_json::from_str("{}").unwrap();
    assert!(event.is_empty());
    assert!(event.locations().unwrap().is_empty());
}

#[test]
fn test_event_missing_key_is_extraction_error() {
    let payload = serde_json::json!({
        "Records": [{"s3": {"bucket": {"name": "b"}, "object": {}}}]
    });
    let event: NotificationEvent = serde_json::from_value(payload).unwrap();
    let err = event.locations().unwrap_err();
    assert!(matches!(err, Error::InvalidEvent { .. }));
    assert_eq!(err.kind(), ErrorKind::Extraction);
}

#[test]
fn test_event_missing_bucket_is_extraction_error() {
    let payload = serde_json::json!({
        "Records": [{"s3": {"object": {"key": "a.csv"}}}]
    });
    let event: NotificationEvent = serde_json::from_value(payload).unwrap();
    assert!(event.locations().is_err());
}

#[test]
fn test_synthetic_event_decodes_to_same_locations() {
    let originals = vec![
        ObjectLocation::new("bucket", "daily loads/a=1&b.csv"),
        ObjectLocation::new("bucket", "plain.csv"),
    ];
    let event = NotificationEvent::for_objects(&originals);
    assert_eq!(event.locations().unwrap(), originals);
}

// ============================================================================
// Extractor
// ============================================================================

#[tokio::test]
async fn test_extract_people_csv() {
    let (storage, location) = storage_with("employee_1.csv", PEOPLE_CSV.as_bytes()).await;
    let extractor = Extractor::new(storage, &ExtractConfig::default()).unwrap();

    let dataset = extractor.extract(&location).await.unwrap();
    assert_eq!(dataset.header, vec!["first", "last", "age", "sex"]);
    assert_eq!(
        dataset.records,
        vec![
            Record::new(Some("Alice"), Some("Brown"), Some("30"), Some("F")),
            Record::new(Some("Charlie"), Some("Davis"), Some("40"), Some("M")),
        ]
    );
    assert_eq!(dataset.source, location);
}

#[tokio::test]
async fn test_extract_empty_cells_are_missing() {
    let (storage, location) = storage_with(
        "sparse.csv",
        b"first,last,age,sex,extra\n,Brown,,F,ignored\n\"Dana\",\"\",abc,  ,\n",
    )
    .await;
    let extractor = Extractor::new(storage, &ExtractConfig::default()).unwrap();

    let dataset = extractor.extract(&location).await.unwrap();
    assert_eq!(dataset.records[0], Record::new(None, Some("Brown"), None, Some("F")));
    assert_eq!(dataset.records[1], Record::new(Some("Dana"), None, Some("abc"), None));
}

#[tokio::test]
async fn test_extract_missing_column() {
    let (storage, location) = storage_with("bad.csv", b"first,last,sex\nA,B,F\n").await;
    let extractor = Extractor::new(storage, &ExtractConfig::default()).unwrap();

    let err = extractor.extract(&location).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(err.to_string().contains("missing columns: age"));
}

#[tokio::test]
async fn test_extract_ragged_row_fails_whole_file() {
    let (storage, location) =
        storage_with("ragged.csv", b"first,last,age,sex\nA,B,1,F\nC,D\n").await;
    let extractor = Extractor::new(storage, &ExtractConfig::default()).unwrap();

    let err = extractor.extract(&location).await.unwrap_err();
    assert!(matches!(err, Error::Extraction { .. }));
}

#[tokio::test]
async fn test_extract_missing_object() {
    let extractor =
        Extractor::new(ObjectStorage::in_memory(), &ExtractConfig::default()).unwrap();
    let err = extractor
        .extract(&ObjectLocation::new("bucket", "nope.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ObjectNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Extraction);
}

#[tokio::test]
async fn test_extract_non_utf8() {
    let (storage, location) = storage_with("latin1.csv", b"first,last,age,sex\n\xe9,B,1,F\n").await;
    let extractor = Extractor::new(storage, &ExtractConfig::default()).unwrap();
    let err = extractor.extract(&location).await.unwrap_err();
    assert!(err.to_string().contains("not UTF-8"));
}

#[test]
fn test_custom_delimiter() {
    let config = ExtractConfig {
        delimiter: ';',
        ..Default::default()
    };
    let extractor = Extractor::new(ObjectStorage::in_memory(), &config).unwrap();
    let dataset = extractor
        .parse(
            &ObjectLocation::new("b", "k.csv"),
            "first;last;age;sex\nAlice;Brown;30;F\n",
        )
        .unwrap();
    assert_eq!(dataset.records[0].first.as_deref(), Some("Alice"));
}

#[test]
fn test_multibyte_delimiter_rejected() {
    let config = ExtractConfig {
        delimiter: '€',
        ..Default::default()
    };
    assert!(Extractor::new(ObjectStorage::in_memory(), &config).is_err());
}
