//! Credential bundle and secret payload parsing

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;

/// Field names of a bundle, in the order they are reported
pub const BUNDLE_FIELDS: [&str; 6] = [
    "user",
    "password",
    "account",
    "warehouse",
    "database",
    "schema",
];

/// Warehouse connection parameters for one invocation
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    /// Login name
    pub user: String,
    /// Password
    pub password: String,
    /// Account identifier (e.g. `xy12345.us-east-1`)
    pub account: String,
    /// Virtual warehouse
    pub warehouse: String,
    /// Default database
    pub database: String,
    /// Default schema
    pub schema: String,
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .finish()
    }
}

impl CredentialBundle {
    /// Build a bundle from a lookup keyed by bundle field name
    ///
    /// Every field is required; missing or blank fields are reported together
    /// by name.
    pub fn from_lookup<F>(source: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(BUNDLE_FIELDS.len());
        let mut missing = Vec::new();

        for field in BUNDLE_FIELDS {
            match lookup(field).filter(|v| !v.trim().is_empty()) {
                Some(v) => values.push(v),
                None => missing.push(field),
            }
        }

        if !missing.is_empty() {
            return Err(Error::secret_payload(
                source,
                format!("missing required fields: {}", missing.join(", ")),
            ));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            user: next(),
            password: next(),
            account: next(),
            warehouse: next(),
            database: next(),
            schema: next(),
        })
    }

    /// Parse a JSON secret payload
    ///
    /// Accepts either the `SNOWFLAKE_USER`, `SNOWFLAKE_PASSWORD`, ... layout
    /// or plain `user`, `password`, ... keys.
    pub fn from_secret_json(secret_name: &str, payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload).map_err(|e| {
            Error::secret_payload(secret_name, format!("payload is not valid JSON: {e}"))
        })?;

        let Value::Object(map) = value else {
            return Err(Error::secret_payload(
                secret_name,
                "payload is not a JSON object",
            ));
        };

        Self::from_lookup(secret_name, |field| {
            let prefixed = format!("SNOWFLAKE_{}", field.to_uppercase());
            map.get(&prefixed)
                .or_else(|| map.get(field))
                .and_then(json_scalar_to_string)
        })
    }
}

fn json_scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
