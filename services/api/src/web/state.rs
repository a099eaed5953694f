//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use site_core::ports::{AssistantService, BlobStore, KvStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Requests are otherwise stateless; everything mutable lives
/// behind the storage ports.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub assistant: Arc<dyn AssistantService>,
    /// Plain HTTP client for the image proxy.
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}
