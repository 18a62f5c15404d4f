//! In-process artifact store.
//!
//! Used by tests and by `hlscache convert --dry-store`. Records every call so
//! callers can assert on what was (or was not) touched, and can be primed
//! with existing keys or injected failures.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ArtifactStore;

/// An object held by [`MemoryArtifactStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    /// Keys in the order they were uploaded.
    upload_log: Mutex<Vec<String>>,
    exists_calls: AtomicUsize,
    exists_failure: Mutex<Option<String>>,
    put_failure: Mutex<Option<String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `bucket`/`key` was uploaded earlier.
    pub fn insert(&self, bucket: &str, key: &str, content_type: &str) {
        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content_type: content_type.to_string(),
                size: 0,
            },
        );
    }

    /// Make every existence check fail with `message`.
    pub fn fail_exists(&self, message: impl Into<String>) {
        *self.exists_failure.lock() = Some(message.into());
    }

    /// Make uploads of keys ending in `suffix` fail.
    pub fn fail_put_for(&self, suffix: impl Into<String>) {
        *self.put_failure.lock() = Some(suffix.into());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Uploaded keys, in upload order.
    pub fn uploads(&self) -> Vec<String> {
        self.upload_log.lock().clone()
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, bucket: &str, key: &str) -> hc_core::Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = *self.exists_failure.lock() {
            return Err(hc_core::Error::Store(message.clone()));
        }
        Ok(self
            .objects
            .lock()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &Path,
        content_type: &str,
    ) -> hc_core::Result<()> {
        let failing = self
            .put_failure
            .lock()
            .as_deref()
            .is_some_and(|suffix| key.ends_with(suffix));
        if failing {
            return Err(hc_core::Error::Store(format!("put {bucket}/{key}: injected failure")));
        }

        let size = tokio::fs::metadata(body)
            .await
            .map_err(|e| hc_core::Error::Store(format!("failed to read {}: {e}", body.display())))?
            .len();

        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content_type: content_type.to_string(),
                size,
            },
        );
        self.upload_log.lock().push(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exists_reflects_inserted_keys() {
        let store = MemoryArtifactStore::new();
        assert!(!store.exists("zidit", "clip.m3u8").await.unwrap());
        store.insert("zidit", "clip.m3u8", "application/vnd.apple.mpegurl");
        assert!(store.exists("zidit", "clip.m3u8").await.unwrap());
        assert!(!store.exists("other", "clip.m3u8").await.unwrap());
        assert_eq!(store.exists_calls(), 3);
    }

    #[tokio::test]
    async fn injected_exists_failure_is_store_error() {
        let store = MemoryArtifactStore::new();
        store.fail_exists("AccessDenied");
        let err = store.exists("zidit", "clip.m3u8").await.unwrap_err();
        assert!(err.is_store());
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn put_records_size_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip0.ts");
        std::fs::write(&file, b"12345").unwrap();

        let store = MemoryArtifactStore::new();
        store.put_object("zidit", "clip0.ts", &file, "video/MP2T").await.unwrap();
        store.put_object("zidit", "clip1.ts", &file, "video/MP2T").await.unwrap();

        assert_eq!(store.uploads(), vec!["clip0.ts", "clip1.ts"]);
        let obj = store.get("zidit", "clip0.ts").unwrap();
        assert_eq!(obj.size, 5);
        assert_eq!(obj.content_type, "video/MP2T");
    }

    #[tokio::test]
    async fn put_of_missing_file_fails() {
        let store = MemoryArtifactStore::new();
        let err = store
            .put_object("zidit", "k", Path::new("/nonexistent/file"), "x")
            .await
            .unwrap_err();
        assert!(err.is_store());
        assert!(store.uploads().is_empty());
    }
}
