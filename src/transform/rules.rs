//! Per-field normalization rules
//!
//! Every rule is total: malformed input maps to a default, never an error.

use super::types::{AgeGroup, SexCode};

/// Trim and title-case a name; blank names are missing
///
/// The first letter of every alphabetic run is upper-cased and the rest
/// lower-cased, so `o'neil` becomes `O'Neil`.
pub fn title_case(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_word = false;
    for c in trimmed.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    Some(out)
}

/// Parse an age, truncating decimals toward zero
///
/// Missing, unparseable and non-finite values become `0`.
pub fn parse_age(value: Option<&str>) -> i64 {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };

    if let Ok(age) = raw.parse::<i64>() {
        return age;
    }

    match raw.parse::<f64>() {
        // `as` saturates out-of-range floats
        Ok(age) if age.is_finite() => age.trunc() as i64,
        _ => 0,
    }
}

/// Normalize a sex value to `M`, `F` or `Unknown`
pub fn normalize_sex(value: Option<&str>) -> SexCode {
    match value.map(|s| s.trim().to_uppercase()).as_deref() {
        Some("M" | "MALE") => SexCode::M,
        Some("F" | "FEMALE") => SexCode::F,
        _ => SexCode::Unknown,
    }
}

/// Bucket an age; negative ages have no group
pub fn age_group(age: i64) -> Option<AgeGroup> {
    match age {
        i64::MIN..=-1 => None,
        0..=25 => Some(AgeGroup::Under25),
        26..=35 => Some(AgeGroup::From25To35),
        36..=45 => Some(AgeGroup::From36To45),
        _ => Some(AgeGroup::Over45),
    }
}
