//! services/api/src/adapters/blob_http.rs
//!
//! This module contains the blob-store adapter, the concrete implementation of
//! the `BlobStore` port against the managed blob REST service. Uploads PUT the
//! raw bytes under a generated path and get back the blob's public URL;
//! deletes address blobs by that URL.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use site_core::ports::{BlobStore, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A blob adapter that implements the `BlobStore` port over the managed
/// blob service's REST API.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl HttpBlobStore {
    /// Creates a new `HttpBlobStore`.
    pub fn new(client: reqwest::Client, api_url: String, token: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

/// The body the blob service returns after a successful upload.
#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

//=========================================================================================
// `BlobStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> PortResult<String> {
        // A random path segment keeps distinct uploads of the same file name
        // from overwriting each other.
        let target = format!("{}/{}-{}", self.api_url, Uuid::new_v4(), file_name);
        let response = self
            .client
            .put(&target)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("blob upload: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "blob upload: store returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("blob upload response: {e}")))?;
        Ok(body.url)
    }

    async fn delete(&self, url: &str) -> PortResult<()> {
        let response = self
            .client
            .delete(&self.api_url)
            .bearer_auth(&self.token)
            .json(&json!({ "urls": [url] }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("blob delete: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "blob delete: store returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
