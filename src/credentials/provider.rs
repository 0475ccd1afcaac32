//! Secret stores and the per-invocation credential provider

use super::types::{CredentialBundle, BUNDLE_FIELDS};
use crate::config::CredentialsConfig;
use crate::error::{Error, Result};
use crate::types::{CredentialSource, OptionStringExt};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix of the credential environment variables
pub const ENV_PREFIX: &str = "SNOWFLAKE_";

// ============================================================================
// Secret Stores
// ============================================================================

/// Read access to named secrets
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Fetch the string payload of a secret, `None` if it does not exist
    async fn get_secret_string(&self, name: &str) -> Result<Option<String>>;
}

/// AWS Secrets Manager
pub struct AwsSecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
}

impl fmt::Debug for AwsSecretsManagerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSecretsManagerStore").finish_non_exhaustive()
    }
}

impl AwsSecretsManagerStore {
    /// Create a store from the ambient AWS configuration
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_secretsmanager::Client::new(&sdk_config))
    }

    /// Wrap an existing client
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    async fn get_secret_string(&self, name: &str) -> Result<Option<String>> {
        let response = self.client.get_secret_value().secret_id(name).send().await;

        match response {
            Ok(output) => Ok(output.secret_string().map(ToString::to_string)),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    Ok(None)
                } else {
                    Err(Error::SecretsStore {
                        message: format!("GetSecretValue for '{name}' failed: {err}"),
                    })
                }
            }
        }
    }
}

/// In-memory secrets, counting reads
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
    reads: AtomicUsize,
}

impl StaticSecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret
    pub fn with_secret(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), payload.into());
        self
    }

    /// Number of reads served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret_string(&self, name: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.secrets.get(name).cloned())
    }
}

// ============================================================================
// Credential Provider
// ============================================================================

/// Resolves the [`CredentialBundle`] for one invocation
#[derive(Clone)]
pub struct CredentialProvider {
    source: CredentialSource,
    secret_name: Option<String>,
    env: HashMap<String, String>,
    store: Option<Arc<dyn SecretStore>>,
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut env_keys: Vec<&String> = self.env.keys().collect();
        env_keys.sort();
        f.debug_struct("CredentialProvider")
            .field("source", &self.source)
            .field("secret_name", &self.secret_name)
            .field("env_keys", &env_keys)
            .field("store", &self.store)
            .finish()
    }
}

impl CredentialProvider {
    /// Create a provider from config, an environment snapshot and a secret store
    ///
    /// The store is only consulted for the secrets-manager source.
    pub fn new(
        config: &CredentialsConfig,
        env: HashMap<String, String>,
        store: Option<Arc<dyn SecretStore>>,
    ) -> Self {
        Self {
            source: config.source,
            secret_name: config.secret_name.clone().none_if_empty(),
            env,
            store,
        }
    }

    /// Snapshot the `SNOWFLAKE_*` variables of the current process
    pub fn env_snapshot() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect()
    }

    /// Configured credential source
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Resolve credentials
    ///
    /// Performs at most one secrets-store read and never caches the result.
    pub async fn resolve(&self) -> Result<CredentialBundle> {
        match self.source {
            CredentialSource::Environment => self.resolve_from_env(),
            CredentialSource::SecretsManager => self.resolve_from_secret().await,
        }
    }

    fn resolve_from_env(&self) -> Result<CredentialBundle> {
        debug!("Resolving credentials from environment");
        let bundle = CredentialBundle::from_lookup("environment", |field| {
            self.env
                .get(&format!("{ENV_PREFIX}{}", field.to_uppercase()))
                .cloned()
        })?;
        info!(
            account = %bundle.account,
            user = %bundle.user,
            "Resolved credentials from environment"
        );
        Ok(bundle)
    }

    async fn resolve_from_secret(&self) -> Result<CredentialBundle> {
        let name = self
            .secret_name
            .as_deref()
            .ok_or_else(|| Error::missing_field("credentials.secret_name"))?;
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::config("No secret store configured"))?;

        debug!(secret = %name, "Reading credentials secret");
        let payload = store
            .get_secret_string(name)
            .await?
            .ok_or_else(|| Error::SecretNotFound {
                name: name.to_string(),
            })?;

        let bundle = CredentialBundle::from_secret_json(name, &payload)?;
        info!(secret = %name, account = %bundle.account, "Resolved credentials from secret");
        Ok(bundle)
    }
}

/// Environment snapshot holding a complete bundle (local runs, tests)
pub fn env_from_bundle(bundle: &CredentialBundle) -> HashMap<String, String> {
    let values = [
        &bundle.user,
        &bundle.password,
        &bundle.account,
        &bundle.warehouse,
        &bundle.database,
        &bundle.schema,
    ];
    BUNDLE_FIELDS
        .iter()
        .zip(values)
        .map(|(field, value)| (format!("{ENV_PREFIX}{}", field.to_uppercase()), value.clone()))
        .collect()
}
