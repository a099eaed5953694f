//! services/api/src/adapters/blob_memory.rs
//!
//! An in-memory `BlobStore` used for local development and the contract
//! tests, selected with `BLOB_BACKEND=memory`. It hands out fake URLs and
//! records every delete so the fan-out tests can assert on them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use site_core::ports::{BlobStore, PortError, PortResult};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs handed to `delete` so far, in call order.
    pub fn deleted_urls(&self) -> Vec<String> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.blobs
            .lock()
            .map(|b| b.contains_key(url))
            .unwrap_or(false)
    }
}

fn poisoned() -> PortError {
    PortError::Unexpected("blob store lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, file_name: &str, _content_type: &str, data: Vec<u8>) -> PortResult<String> {
        let url = format!("memory://blobs/{}/{}", Uuid::new_v4(), file_name);
        let mut blobs = self.blobs.lock().map_err(|_| poisoned())?;
        blobs.insert(url.clone(), data);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> PortResult<()> {
        let mut blobs = self.blobs.lock().map_err(|_| poisoned())?;
        blobs.remove(url);
        let mut deleted = self.deleted.lock().map_err(|_| poisoned())?;
        deleted.push(url.to_string());
        Ok(())
    }
}
