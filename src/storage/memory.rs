//! In-process artifact store.
//!
//! Used by tests and dry runs; nothing is persisted.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ArtifactStore, StorageError};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Artifact store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    puts: Mutex<usize>,
    fail_uploads: bool,
}

impl MemoryArtifactStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// A store whose uploads always fail.
    pub fn failing() -> Self {
        Self {
            base_url: "memory://failing".to_string(),
            fail_uploads: true,
            ..Default::default()
        }
    }

    /// Number of upload attempts, failed ones included.
    pub fn put_count(&self) -> usize {
        self.puts.lock().map(|p| *p).unwrap_or(0)
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        if let Ok(mut puts) = self.puts.lock() {
            *puts += 1;
        }

        if self.fail_uploads {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "simulated failure".to_string(),
            });
        }

        let mut objects = self.objects.lock().map_err(|e| StorageError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}
