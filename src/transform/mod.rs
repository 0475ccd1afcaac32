//! Transformation stage
//!
//! Pure, infallible normalization of raw records: title-cased names, integer
//! ages, normalized sex codes, an age bucket and one load timestamp per batch.

mod clock;
mod rules;
mod transformer;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use rules::{age_group, normalize_sex, parse_age, title_case};
pub use transformer::{enrich, Transformer};
pub use types::{AgeGroup, EnrichedRecord, SexCode};

#[cfg(test)]
mod tests;
