//! Object storage access
//!
//! Reads and writes objects addressed as `bucket/key` through `object_store`,
//! so the same code runs against S3, a local directory, or memory.

mod location;
mod provider;

pub use location::{ObjectLocation, PrefixLocation};
pub use provider::{
    build_store_provider, InMemoryStoreProvider, LocalStoreProvider, S3StoreProvider,
    StoreProvider,
};

use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::sync::Arc;

/// Metadata of a listed object
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Where the object lives
    pub location: ObjectLocation,
    /// Last modification time reported by the store
    pub last_modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Bucket-addressed facade over a [`StoreProvider`]
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    provider: Arc<dyn StoreProvider>,
}

impl ObjectStorage {
    /// Create storage over a provider
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self { provider }
    }

    /// In-memory storage (tests, dry runs)
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStoreProvider::new()))
    }

    /// Read a whole object
    pub async fn get(&self, location: &ObjectLocation) -> Result<Bytes> {
        let store = self.provider.store_for(&location.bucket)?;
        let result = store.get(&location.path()).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => Error::ObjectNotFound {
                location: location.to_string(),
            },
            other => Error::extraction(location.to_string(), other.to_string()),
        })?;

        result
            .bytes()
            .await
            .map_err(|e| Error::extraction(location.to_string(), e.to_string()))
    }

    /// Write a whole object, replacing any existing one
    pub async fn put(&self, location: &ObjectLocation, data: Bytes) -> Result<()> {
        let store = self.provider.store_for(&location.bucket)?;
        store.put(&location.path(), data.into()).await?;
        Ok(())
    }

    /// List objects under a prefix, sorted by key
    pub async fn list(&self, prefix: &PrefixLocation) -> Result<Vec<StoredObject>> {
        let store = self.provider.store_for(&prefix.bucket)?;
        let path = prefix.path();
        let metas: Vec<object_store::ObjectMeta> =
            store.list(path.as_ref()).try_collect().await?;

        let mut objects: Vec<StoredObject> = metas
            .into_iter()
            .map(|meta| StoredObject {
                location: ObjectLocation::new(&prefix.bucket, meta.location.to_string()),
                last_modified: meta.last_modified,
                size: meta.size as u64,
            })
            .collect();
        objects.sort_by(|a, b| a.location.key.cmp(&b.location.key));

        Ok(objects)
    }
}
