//! Dataset transformation

use super::clock::Clock;
use super::rules::{age_group, normalize_sex, parse_age, title_case};
use super::types::EnrichedRecord;
use crate::extract::{Dataset, Record};
use chrono::{NaiveDateTime, SubsecRound};
use std::sync::Arc;
use tracing::debug;

/// Applies the normalization rules to a whole dataset
#[derive(Debug, Clone)]
pub struct Transformer {
    clock: Arc<dyn Clock>,
}

impl Transformer {
    /// Create a transformer reading load times from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Transform every record, stamping all of them with one load time
    pub fn transform(&self, dataset: &Dataset) -> Vec<EnrichedRecord> {
        // Microsecond precision is what the warehouse timestamp columns keep
        let load_time = self.clock.now().naive_utc().trunc_subsecs(6);
        let records: Vec<EnrichedRecord> = dataset
            .records
            .iter()
            .map(|r| enrich(r, load_time))
            .collect();

        debug!(
            source = %dataset.source,
            rows = records.len(),
            load_time = %load_time,
            "Transformed dataset"
        );
        records
    }
}

/// Enrich one record
pub fn enrich(record: &Record, load_time: NaiveDateTime) -> EnrichedRecord {
    let age = parse_age(record.age.as_deref());
    EnrichedRecord {
        first: title_case(record.first.as_deref()),
        last: title_case(record.last.as_deref()),
        age,
        sex: normalize_sex(record.sex.as_deref()),
        age_group: age_group(age),
        load_time,
    }
}
