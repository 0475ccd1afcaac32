//! Tests for the transformation stage

use super::*;
use crate::extract::{Dataset, Record};
use crate::storage::ObjectLocation;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use test_case::test_case;

fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
}

fn dataset(records: Vec<Record>) -> Dataset {
    Dataset {
        source: ObjectLocation::new("s3-sfbucket", "employee_1.csv"),
        header: vec!["first".into(), "last".into(), "age".into(), "sex".into()],
        records,
    }
}

// ============================================================================
// Rules
// ============================================================================

#[test_case(Some("alice") => Some("Alice".to_string()); "lowercase")]
#[test_case(Some("  bROWN ") => Some("Brown".to_string()); "trimmed mixed case")]
#[test_case(Some("o'neil") => Some("O'Neil".to_string()); "apostrophe starts new word")]
#[test_case(Some("mary-jane van dyke") => Some("Mary-Jane Van Dyke".to_string()); "hyphen and spaces")]
#[test_case(Some("   ") => None; "blank")]
#[test_case(None => None; "missing")]
fn test_title_case(input: Option<&str>) -> Option<String> {
    title_case(input)
}

#[test_case(Some("30") => 30; "integer")]
#[test_case(Some(" 42 ") => 42; "padded integer")]
#[test_case(Some("30.9") => 30; "decimal truncates")]
#[test_case(Some("-2.5") => -2; "negative decimal truncates toward zero")]
#[test_case(Some("abc") => 0; "unparseable")]
#[test_case(Some("") => 0; "empty")]
#[test_case(Some("NaN") => 0; "not a number")]
#[test_case(Some("inf") => 0; "infinite")]
#[test_case(None => 0; "missing")]
fn test_parse_age(input: Option<&str>) -> i64 {
    parse_age(input)
}

#[test_case(Some("M") => SexCode::M; "code m")]
#[test_case(Some("male") => SexCode::M; "lowercase male")]
#[test_case(Some(" Male ") => SexCode::M; "padded male")]
#[test_case(Some("f") => SexCode::F; "lowercase code f")]
#[test_case(Some("FEMALE") => SexCode::F; "uppercase female")]
#[test_case(Some("x") => SexCode::Unknown; "other value")]
#[test_case(Some("") => SexCode::Unknown; "empty")]
#[test_case(None => SexCode::Unknown; "missing")]
fn test_normalize_sex(input: Option<&str>) -> SexCode {
    normalize_sex(input)
}

#[test_case(0 => Some(AgeGroup::Under25))]
#[test_case(25 => Some(AgeGroup::Under25))]
#[test_case(26 => Some(AgeGroup::From25To35))]
#[test_case(35 => Some(AgeGroup::From25To35))]
#[test_case(36 => Some(AgeGroup::From36To45))]
#[test_case(45 => Some(AgeGroup::From36To45))]
#[test_case(46 => Some(AgeGroup::Over45))]
#[test_case(120 => Some(AgeGroup::Over45))]
#[test_case(-1 => None; "negative")]
fn test_age_group(age: i64) -> Option<AgeGroup> {
    age_group(age)
}

#[test]
fn test_labels() {
    assert_eq!(AgeGroup::Under25.label(), "Under 25");
    assert_eq!(AgeGroup::From25To35.to_string(), "25-35");
    assert_eq!(AgeGroup::From36To45.to_string(), "36-45");
    assert_eq!(AgeGroup::Over45.to_string(), "Over 45");
    assert_eq!(SexCode::Unknown.to_string(), "Unknown");
    assert_eq!(
        serde_json::to_string(&AgeGroup::Under25).unwrap(),
        "\"Under 25\""
    );
}

// ============================================================================
// Transformer
// ============================================================================

#[test]
fn test_transform_two_row_sample() {
    let transformer = Transformer::new(Arc::new(FixedClock(fixed_instant())));
    let records = transformer.transform(&dataset(vec![
        Record::new(Some("Alice"), Some("Brown"), Some("30"), Some("F")),
        Record::new(Some("Charlie"), Some("Davis"), Some("40"), Some("M")),
    ]));

    let load_time = fixed_instant().naive_utc();
    assert_eq!(
        records,
        vec![
            EnrichedRecord {
                first: Some("Alice".into()),
                last: Some("Brown".into()),
                age: 30,
                sex: SexCode::F,
                age_group: Some(AgeGroup::From25To35),
                load_time,
            },
            EnrichedRecord {
                first: Some("Charlie".into()),
                last: Some("Davis".into()),
                age: 40,
                sex: SexCode::M,
                age_group: Some(AgeGroup::From36To45),
                load_time,
            },
        ]
    );
}

#[test]
fn test_transform_shares_one_load_time() {
    let transformer = Transformer::new(Arc::new(SystemClock));
    let rows = (0..50)
        .map(|i| Record::new(Some("a"), Some("b"), Some(&i.to_string()), Some("m")))
        .collect();
    let records = transformer.transform(&dataset(rows));

    assert_eq!(records.len(), 50);
    assert!(records.iter().all(|r| r.load_time == records[0].load_time));
}

#[test]
fn test_transform_malformed_row_never_fails() {
    let transformer = Transformer::new(Arc::new(FixedClock(fixed_instant())));
    let records = transformer.transform(&dataset(vec![Record::new(
        None,
        Some("  "),
        Some("unknown"),
        Some("?"),
    )]));

    let record = &records[0];
    assert_eq!(record.first, None);
    assert_eq!(record.last, None);
    assert_eq!(record.age, 0);
    assert_eq!(record.sex, SexCode::Unknown);
    assert_eq!(record.age_group, Some(AgeGroup::Under25));
}

#[test]
fn test_transform_empty_dataset() {
    let transformer = Transformer::new(Arc::new(SystemClock));
    assert!(transformer.transform(&dataset(vec![])).is_empty());
}

#[test]
fn test_load_time_truncated_to_micros() {
    let instant = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    let transformer = Transformer::new(Arc::new(FixedClock(instant)));
    let records =
        transformer.transform(&dataset(vec![Record::new(None, None, None, None)]));
    assert_eq!(
        records[0].load_time.and_utc().timestamp_subsec_nanos(),
        123_456_000
    );
}
