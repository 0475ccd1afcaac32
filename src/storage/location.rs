//! Bucket/key addressing for stored objects

use crate::error::{Error, Result};
use object_store::path::Path as ObjectPath;
use std::fmt;

/// A single object in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    /// Bucket name
    pub bucket: String,
    /// Object key within the bucket
    pub key: String,
}

impl ObjectLocation {
    /// Create a location from bucket and key
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an `s3://bucket/key` URL
    pub fn parse(url: &str) -> Result<Self> {
        let (bucket, key) = split_url(url)?;
        if key.is_empty() {
            return Err(Error::config(format!("URL has no object key: {url}")));
        }
        Ok(Self::new(bucket, key))
    }

    /// Build a location from the raw key of an S3 event notification
    ///
    /// Notification keys are form-url-encoded: `+` is a space and reserved
    /// characters arrive as `%XX`.
    pub fn from_notification(bucket: impl Into<String>, raw_key: &str) -> Self {
        Self::new(bucket, decode_notification_key(raw_key))
    }

    /// Object store path for the key
    pub fn path(&self) -> ObjectPath {
        ObjectPath::from(self.key.as_str())
    }

    /// File name component of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A bucket plus key prefix, e.g. the external location behind a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLocation {
    /// Bucket name
    pub bucket: String,
    /// Key prefix (may be empty)
    pub prefix: String,
}

impl PrefixLocation {
    /// Parse an `s3://bucket[/prefix]` URL
    pub fn parse(url: &str) -> Result<Self> {
        let (bucket, prefix) = split_url(url)?;
        Ok(Self {
            bucket,
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Object store path for the prefix, if any
    pub fn path(&self) -> Option<ObjectPath> {
        if self.prefix.is_empty() {
            None
        } else {
            Some(ObjectPath::from(self.prefix.as_str()))
        }
    }

    /// Key relative to this prefix; keys outside it are returned whole
    pub fn relative_key<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return key;
        }
        key.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map_or(key, |rest| rest.trim_start_matches('/'))
    }
}

impl fmt::Display for PrefixLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "s3://{}", self.bucket)
        } else {
            write!(f, "s3://{}/{}", self.bucket, self.prefix)
        }
    }
}

/// Split `scheme://bucket/rest` into bucket and rest
fn split_url(url: &str) -> Result<(String, String)> {
    let without_scheme = url
        .strip_prefix("s3://")
        .or_else(|| url.strip_prefix("s3a://"))
        .ok_or_else(|| Error::config(format!("Invalid S3 URL: {url}")))?;

    let (bucket, rest) = match without_scheme.find('/') {
        Some(idx) => (&without_scheme[..idx], &without_scheme[idx + 1..]),
        None => (without_scheme, ""),
    };

    if bucket.is_empty() {
        return Err(Error::config(format!("URL has no bucket: {url}")));
    }

    Ok((bucket.to_string(), rest.to_string()))
}

/// Decode a form-url-encoded notification key
///
/// Literal `&` and `=` are part of the key, not pair separators.
fn decode_notification_key(raw: &str) -> String {
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_url() {
        let loc = ObjectLocation::parse("s3://s3-sfbucket/incoming/employee_1.csv").unwrap();
        assert_eq!(loc.bucket, "s3-sfbucket");
        assert_eq!(loc.key, "incoming/employee_1.csv");
        assert_eq!(loc.file_name(), "employee_1.csv");
        assert_eq!(loc.to_string(), "s3://s3-sfbucket/incoming/employee_1.csv");
    }

    #[test]
    fn test_parse_object_url_requires_key() {
        assert!(ObjectLocation::parse("s3://bucket").is_err());
        assert!(ObjectLocation::parse("s3://bucket/").is_err());
        assert!(ObjectLocation::parse("gs://bucket/key").is_err());
    }

    #[test]
    fn test_notification_key_decoding() {
        let loc = ObjectLocation::from_notification("b", "daily+loads/employee%3A2024.csv");
        assert_eq!(loc.key, "daily loads/employee:2024.csv");

        let loc = ObjectLocation::from_notification("b", "dt%3D2024-01-01/data.csv");
        assert_eq!(loc.key, "dt=2024-01-01/data.csv");

        let loc = ObjectLocation::from_notification("b", "plain.csv");
        assert_eq!(loc.key, "plain.csv");

        let loc = ObjectLocation::from_notification("b", "a&b=c.csv");
        assert_eq!(loc.key, "a&b=c.csv");
    }

    #[test]
    fn test_prefix_location() {
        let stage = PrefixLocation::parse("s3://landing/incoming/").unwrap();
        assert_eq!(stage.bucket, "landing");
        assert_eq!(stage.prefix, "incoming");
        assert_eq!(stage.relative_key("incoming/a.csv"), "a.csv");
        assert_eq!(stage.to_string(), "s3://landing/incoming");

        // Prefix match stops at a path segment boundary
        assert_eq!(
            stage.relative_key("incoming_archive/a.csv"),
            "incoming_archive/a.csv"
        );
        assert_eq!(stage.relative_key("other/a.csv"), "other/a.csv");

        let root = PrefixLocation::parse("s3://landing").unwrap();
        assert!(root.path().is_none());
        assert_eq!(root.relative_key("a.csv"), "a.csv");
    }
}
