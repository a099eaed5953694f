//! services/api/src/adapters/kv_redis.rs
//!
//! This module contains the Redis adapter, which is the concrete implementation
//! of the `KvStore` port from the `core` crate. The managed KV service speaks
//! the Redis protocol, so all access goes through a shared `ConnectionManager`.

use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use site_core::ports::{KvStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A KV adapter that implements the `KvStore` port against a Redis-protocol
/// managed store.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Connects to the store and returns an adapter holding a multiplexed
    /// connection. The manager reconnects on its own after network drops.
    pub async fn connect(redis_url: &str) -> PortResult<Self> {
        let client = Client::open(redis_url).map_err(to_port_error)?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_secs(5));
        let conn = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(to_port_error)?;
        Ok(Self { conn })
    }
}

fn to_port_error(e: redis::RedisError) -> PortError {
    PortError::Unexpected(format!("kv store: {e}"))
}

//=========================================================================================
// `KvStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(to_port_error)
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(to_port_error)
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(to_port_error)
    }

    /// Cursor-paginated `SCAN MATCH <prefix>*`. The store has no secondary
    /// indexes, so every list endpoint funnels through this scan.
    async fn scan_prefix(&self, prefix: &str) -> PortResult<Vec<(String, String)>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(to_port_error)?;
            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        // Keys can disappear between the scan and the read; skip the holes.
        let values: Vec<Option<String>> = conn.mget(&keys).await.map_err(to_port_error)?;
        Ok(keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }
}
