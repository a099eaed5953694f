//! services/api/src/adapters/kv_memory.rs
//!
//! An in-memory `KvStore` used for local development and the contract tests,
//! selected with `KV_BACKEND=memory`. A `BTreeMap` keeps keys ordered, which
//! makes prefix scans a simple range walk.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use site_core::ports::{KvStore, PortError, PortResult};

#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> PortError {
    PortError::Unexpected("kv store lock poisoned".to_string())
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> PortResult<Vec<(String, String)>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_prefix_is_bounded_to_the_prefix() {
        let store = MemoryKvStore::new();
        store.set("article:1", "a").await.unwrap();
        store.set("article:2", "b").await.unwrap();
        store.set("chat-log:1", "c").await.unwrap();

        let articles = store.scan_prefix("article:").await.unwrap();
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|(k, _)| k.starts_with("article:")));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryKvStore::new();
        store.set("user:a@b.com", "{}").await.unwrap();
        store.delete("user:a@b.com").await.unwrap();
        store.delete("user:a@b.com").await.unwrap();
        assert!(store.get("user:a@b.com").await.unwrap().is_none());
    }
}
