//! Enriched record types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized sex code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SexCode {
    M,
    F,
    Unknown,
}

impl SexCode {
    /// Value written to the warehouse
    pub fn as_str(&self) -> &'static str {
        match self {
            SexCode::M => "M",
            SexCode::F => "F",
            SexCode::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SexCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    /// 0 to 25 inclusive
    #[serde(rename = "Under 25")]
    Under25,
    /// 26 to 35
    #[serde(rename = "25-35")]
    From25To35,
    /// 36 to 45
    #[serde(rename = "36-45")]
    From36To45,
    /// 46 and above
    #[serde(rename = "Over 45")]
    Over45,
}

impl AgeGroup {
    /// Label written to the warehouse
    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Under25 => "Under 25",
            AgeGroup::From25To35 => "25-35",
            AgeGroup::From36To45 => "36-45",
            AgeGroup::Over45 => "Over 45",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transformed row, ready for loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub first: Option<String>,
    pub last: Option<String>,
    pub age: i64,
    pub sex: SexCode,
    pub age_group: Option<AgeGroup>,
    /// UTC wall-clock time shared by the whole batch
    pub load_time: NaiveDateTime,
}
