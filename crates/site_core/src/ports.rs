//! crates/site_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the managed KV
//! store, the blob store, or the LLM API.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::ChatTurn;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., KV store, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The token stream an assistant adapter relays back to the caller.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, PortError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The managed key-value store. Values are opaque strings (JSON documents
/// for every entity except the phone index, which stores a bare email).
/// There are no transactions and no secondary indexes; list endpoints are
/// prefix scans.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> PortResult<()>;

    /// Returns every `(key, value)` pair whose key starts with `prefix`.
    /// Implementations paginate internally (cursor scans); callers see the
    /// full result set in unspecified order.
    async fn scan_prefix(&self, prefix: &str) -> PortResult<Vec<(String, String)>>;
}

/// The managed blob store for uploaded files. Blobs are addressed by the
/// public URL the store hands back on upload.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns the public URL of the new blob.
    async fn put(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> PortResult<String>;

    async fn delete(&self, url: &str) -> PortResult<()>;
}

/// The external LLM behind the site's chat widget. The conversation is
/// forwarded verbatim and the answer comes back as a token stream.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn stream_chat(&self, messages: &[ChatTurn]) -> PortResult<ChatStream>;
}
