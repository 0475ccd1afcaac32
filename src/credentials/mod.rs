//! Warehouse credential resolution
//!
//! Credentials come either from `SNOWFLAKE_*` environment variables or from a
//! named secret in a secrets store. They are resolved once per invocation,
//! before any warehouse connection is attempted, and never cached.

mod provider;
mod types;

pub use provider::{
    env_from_bundle, AwsSecretsManagerStore, CredentialProvider, SecretStore,
    StaticSecretStore, ENV_PREFIX,
};
pub use types::{CredentialBundle, BUNDLE_FIELDS};

#[cfg(test)]
mod tests;
