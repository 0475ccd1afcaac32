//! Object store construction per bucket (S3, local directory, in-memory)

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::types::StorageBackend;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Resolves the object store that serves a bucket
pub trait StoreProvider: Send + Sync + std::fmt::Debug {
    /// Get a store rooted at the given bucket
    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>>;
}

/// Build the provider selected by the storage config
pub fn build_store_provider(config: &StorageConfig) -> Result<Arc<dyn StoreProvider>> {
    match config.backend {
        StorageBackend::S3 => Ok(Arc::new(S3StoreProvider::from_config(config))),
        StorageBackend::Local => {
            let root = config
                .local_root
                .clone()
                .ok_or_else(|| Error::missing_field("storage.local_root"))?;
            Ok(Arc::new(LocalStoreProvider::new(root)))
        }
        StorageBackend::Memory => Ok(Arc::new(InMemoryStoreProvider::new())),
    }
}

// ============================================================================
// S3
// ============================================================================

/// Amazon S3, credentials and region from the environment
#[derive(Debug, Clone, Default)]
pub struct S3StoreProvider {
    region: Option<String>,
    endpoint: Option<String>,
    allow_http: bool,
}

impl S3StoreProvider {
    /// Create a provider from the storage config
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            allow_http: config.allow_http,
        }
    }
}

impl StoreProvider for S3StoreProvider {
    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(ref region) = self.region {
            builder = builder.with_region(region);
        }
        if let Some(ref endpoint) = self.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if self.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create S3 client for {bucket}: {e}")))?;

        Ok(Arc::new(store))
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Local directory tree: `<root>/<bucket>/<key>`
#[derive(Debug, Clone)]
pub struct LocalStoreProvider {
    root: PathBuf,
}

impl LocalStoreProvider {
    /// Create a provider rooted at a directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StoreProvider for LocalStoreProvider {
    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let dir = self.root.join(bucket);

        // Create directory if it doesn't exist
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::config(format!("Failed to create directory {}: {e}", dir.display()))
        })?;

        let store = LocalFileSystem::new_with_prefix(&dir)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Arc::new(store))
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// One in-memory store per bucket, created on first use
#[derive(Debug, Default)]
pub struct InMemoryStoreProvider {
    buckets: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl InMemoryStoreProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreProvider for InMemoryStoreProvider {
    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| Error::Other("in-memory bucket registry poisoned".to_string()))?;
        let store: Arc<dyn ObjectStore> = buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone();
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_local_requires_root() {
        let config = StorageConfig {
            backend: StorageBackend::Local,
            ..Default::default()
        };
        assert!(build_store_provider(&config).is_err());
    }

    #[test]
    fn test_local_provider_creates_bucket_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let provider = LocalStoreProvider::new(temp_dir.path());
        provider.store_for("landing").unwrap();
        assert!(temp_dir.path().join("landing").is_dir());
    }

    #[test]
    fn test_in_memory_provider_reuses_store() {
        let provider = InMemoryStoreProvider::new();
        let a = provider.store_for("bucket").unwrap();
        let b = provider.store_for("bucket").unwrap();
        let c = provider.store_for("other").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
