use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chorelog_common::{Error, Result};
use dashmap::{DashMap, DashSet};

use super::ObjectStore;

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// In-process object store.
///
/// Can be switched into an unavailable state to exercise storage failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: DashSet<String>,
    objects: DashMap<(String, String), StoredObject>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `Error::Storage` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.contains(bucket)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::storage("object store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.buckets.insert(bucket.to_string()))
    }

    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.check_available()?;
        if !self.buckets.contains(bucket) {
            return Err(Error::storage(format!("bucket '{}' does not exist", bucket)));
        }
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn url_for(&self, bucket: &str, key: &str) -> Result<String> {
        self.check_available()?;
        Ok(format!("memory://{}/{}", bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_bucket_is_idempotent() {
        let store = MemoryStore::new();
        assert!(store.ensure_bucket("housework").await.unwrap());
        assert!(!store.ensure_bucket("housework").await.unwrap());
        assert!(store.has_bucket("housework"));
    }

    #[tokio::test]
    async fn test_upload_and_read_back() {
        let store = MemoryStore::new();
        store.ensure_bucket("housework").await.unwrap();
        store
            .upload("housework", "a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        let object = store.object("housework", "a.png").unwrap();
        assert_eq!(object.data.as_ref(), b"png");
        assert_eq!(object.content_type, "image/png");
        assert_eq!(
            store.url_for("housework", "a.png").await.unwrap(),
            "memory://housework/a.png"
        );
    }

    #[tokio::test]
    async fn test_upload_to_missing_bucket_fails() {
        let store = MemoryStore::new();
        let err = store
            .upload("nope", "a.png", Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_everything() {
        let store = MemoryStore::new();
        store.ensure_bucket("housework").await.unwrap();
        store.set_unavailable(true);

        assert!(store.ensure_bucket("housework").await.is_err());
        assert!(store
            .upload("housework", "a", Bytes::new(), "image/png")
            .await
            .is_err());
        assert!(store.url_for("housework", "a").await.is_err());

        store.set_unavailable(false);
        assert!(store.url_for("housework", "a").await.is_ok());
    }
}
