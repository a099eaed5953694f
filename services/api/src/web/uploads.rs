//! services/api/src/web/uploads.rs
//!
//! File uploads into the blob store, bulk blob deletion, and the image
//! proxy used by the article editor for cross-origin covers.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::{delete_blob_best_effort, AppResult};

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteUploadsRequest {
    pub urls: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteUploadsResponse {
    pub deleted: usize,
}

#[derive(Deserialize)]
pub struct ImageProxyParams {
    pub url: String,
}

/// Upload one file (any authenticated user).
///
/// Accepts a multipart/form-data request with a single file part and
/// returns the public URL of the stored blob.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "The file to upload."),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Multipart form must include a file"),
        (status = 502, description = "The blob store rejected the upload")
    ),
    security(("bearer_token" = [])),
    tag = "uploads"
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read multipart data: {e}")))?
        .ok_or_else(|| ApiError::BadRequest("multipart form must include a file".to_string()))?;

    let file_name = field.file_name().unwrap_or("upload.bin").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read file bytes: {e}")))?;

    let url = state
        .blobs
        .put(&file_name, &content_type, data.to_vec())
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

/// Delete a batch of uploaded files by URL (admin, `full`).
///
/// Best-effort and sequential: per-URL failures are logged and skipped.
#[utoipa::path(
    delete,
    path = "/api/upload",
    request_body = DeleteUploadsRequest,
    responses(
        (status = 200, description = "Count of blobs deleted", body = DeleteUploadsResponse),
        (status = 403, description = "Requires the full admin role")
    ),
    security(("bearer_token" = [])),
    tag = "uploads"
)]
pub async fn delete_uploads_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DeleteUploadsRequest>,
) -> AppResult<Json<DeleteUploadsResponse>> {
    auth.require_full()?;
    let mut deleted = 0;
    for url in &req.urls {
        if delete_blob_best_effort(state.blobs.as_ref(), url).await {
            deleted += 1;
        }
    }
    Ok(Json(DeleteUploadsResponse { deleted }))
}

/// Fetch a remote image and relay its body and content type.
#[utoipa::path(
    get,
    path = "/api/image-proxy",
    params(("url" = String, Query, description = "The http(s) URL of the image to fetch")),
    responses(
        (status = 200, description = "The proxied image bytes"),
        (status = 400, description = "Missing or non-http(s) URL"),
        (status = 502, description = "The origin could not be fetched")
    ),
    tag = "uploads"
)]
pub async fn image_proxy_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImageProxyParams>,
) -> AppResult<impl IntoResponse> {
    if !params.url.starts_with("http://") && !params.url.starts_with("https://") {
        return Err(ApiError::BadRequest(
            "url must be an http(s) address".to_string(),
        ));
    }

    let response = state
        .http
        .get(&params.url)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("image fetch failed: {e}")))?;
    if !response.status().is_success() {
        return Err(ApiError::Upstream(format!(
            "origin returned {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Upstream(format!("image body read failed: {e}")))?;

    Ok(([(header::CONTENT_TYPE, content_type)], body))
}
