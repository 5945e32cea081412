//! Object storage for uploaded record photos.
//!
//! Everything above this module talks to an [`ObjectStore`] trait object so
//! the server runs the same way against MinIO and against the in-process
//! [`MemoryStore`] used by tests and local development.

mod memory;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chorelog_common::Result;

use crate::config::{StorageBackend, StorageConfig};

pub use memory::MemoryStore;
pub use s3::S3Store;

/// A bucket-oriented blob store.
///
/// Every failure (network, credentials, missing bucket) is reported as
/// `Error::Storage`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` when it does not exist yet.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The bucket was created
    /// * `Ok(false)` - The bucket already existed
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool>;

    /// Store `data` under `key`, replacing any existing object.
    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// A URL a client can fetch the object from.
    async fn url_for(&self, bucket: &str, key: &str) -> Result<String>;
}

/// Build the store selected by `config.backend`.
pub fn build_store(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend {
        StorageBackend::S3 => Arc::new(S3Store::new(config)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    }
}

/// The canonical stored reference for an object.
pub fn object_reference(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, key)
}

/// Split a stored reference back into `(bucket, key)`.
///
/// Returns `None` for references that were not produced by
/// [`object_reference`], such as verbatim URLs supplied by clients.
pub fn parse_reference(reference: &str) -> Option<(&str, &str)> {
    if reference.contains("://") {
        return None;
    }
    let (bucket, key) = reference.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}
