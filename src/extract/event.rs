//! Object-storage write notification payload

use crate::error::{Error, Result};
use crate::storage::ObjectLocation;
use serde::{Deserialize, Serialize};

/// Notification delivered to the function when objects are written
///
/// Only the fields the pipeline reads are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// One entry per written object
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

/// A single object notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Event name, e.g. `ObjectCreated:Put`
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    /// Bucket and object details
    #[serde(default)]
    pub s3: S3Entity,
}

/// Bucket and object of a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: BucketEntity,
    #[serde(default)]
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntity {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntity {
    /// Form-url-encoded object key
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl NotificationEvent {
    /// Build a synthetic event for the given objects
    pub fn for_objects<'a>(locations: impl IntoIterator<Item = &'a ObjectLocation>) -> Self {
        let records = locations
            .into_iter()
            .map(|loc| NotificationRecord {
                event_name: Some("ObjectCreated:Put".to_string()),
                s3: S3Entity {
                    bucket: BucketEntity {
                        name: Some(loc.bucket.clone()),
                    },
                    object: ObjectEntity {
                        key: Some(encode_key(&loc.key)),
                        size: None,
                    },
                },
            })
            .collect();
        Self { records }
    }

    /// Whether the event carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decoded object locations, in notification order
    ///
    /// A record without a bucket name or object key fails the whole event.
    pub fn locations(&self) -> Result<Vec<ObjectLocation>> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let bucket = record
                    .s3
                    .bucket
                    .name
                    .as_deref()
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| {
                        Error::invalid_event(format!("record {idx} has no bucket name"))
                    })?;
                let key = record
                    .s3
                    .object
                    .key
                    .as_deref()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| Error::invalid_event(format!("record {idx} has no object key")))?;
                Ok(ObjectLocation::from_notification(bucket, key))
            })
            .collect()
    }
}

/// Encode a key the way notifications carry it
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| url::form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}
