//! Extraction stage
//!
//! Turns an object-storage write notification into object locations and
//! reads each object into a [`Dataset`] of raw [`Record`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! let extractor = Extractor::new(storage, &config.extract)?;
//! for location in event.locations()? {
//!     let dataset = extractor.extract(&location).await?;
//! }
//! ```

mod event;
mod extractor;
mod types;

pub use event::{BucketEntity, NotificationEvent, NotificationRecord, ObjectEntity, S3Entity};
pub use extractor::Extractor;
pub use types::{Dataset, Record};

#[cfg(test)]
mod tests;
