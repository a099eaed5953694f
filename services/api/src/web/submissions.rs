//! services/api/src/web/submissions.rs
//!
//! Service applications: authenticated create, admin list, status update,
//! admin delete with blob fan-out. The storage key embeds the submitting
//! user's email and a millisecond timestamp, which doubles as the id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use site_core::{decode_document, keys, status, Submission};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::{delete_document_with_blobs, find_by_id_suffix, AppResult};

#[derive(Deserialize, ToSchema)]
pub struct CreateSubmissionRequest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub file_urls: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

/// Apply for a service (any authenticated user).
#[utoipa::path(
    post,
    path = "/api/submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Application stored with status pending"),
        (status = 400, description = "Missing service or details")
    ),
    security(("bearer_token" = [])),
    tag = "submissions"
)]
pub async fn create_submission_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateSubmissionRequest>,
) -> AppResult<impl IntoResponse> {
    if req.service.trim().is_empty() || req.details.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "service and details are required".to_string(),
        ));
    }

    let now = Utc::now();
    let timestamp_ms = now.timestamp_millis();
    let submission = Submission {
        id: timestamp_ms.to_string(),
        email: auth.email.clone(),
        service: req.service,
        details: req.details,
        file_urls: req.file_urls,
        status: status::PENDING.to_string(),
        created_at: now,
    };
    let document = serde_json::to_string(&submission)
        .map_err(|e| ApiError::Internal(format!("failed to serialize submission: {e}")))?;
    state
        .kv
        .set(&keys::submission(&auth.email, timestamp_ms), &document)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// List all applications (admin).
#[utoipa::path(
    get,
    path = "/api/submissions",
    responses(
        (status = 200, description = "All applications, newest first"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_token" = [])),
    tag = "submissions"
)]
pub async fn list_submissions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<Submission>>> {
    auth.require_admin()?;
    let mut items: Vec<Submission> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(keys::SUBMISSION_PREFIX).await? {
        match decode_document::<Submission>(&raw) {
            Ok(item) => items.push(item),
            Err(e) => warn!(%key, error = %e, "skipping undecodable submission"),
        }
    }
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(items))
}

/// Update an application's status (admin, `full`).
///
/// A whole-document read-modify-write. Any status string is accepted; the
/// admin console owns the pending/accepted/completed/rejected transitions.
#[utoipa::path(
    put,
    path = "/api/submissions/{id}/status",
    params(("id" = String, Path, description = "Submission id (millisecond timestamp)")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated application"),
        (status = 400, description = "Missing status"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such application")
    ),
    security(("bearer_token" = [])),
    tag = "submissions"
)]
pub async fn update_submission_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<Value>> {
    auth.require_full()?;
    if req.status.trim().is_empty() {
        return Err(ApiError::BadRequest("status is required".to_string()));
    }

    let (key, mut doc) = find_by_id_suffix(state.kv.as_ref(), keys::SUBMISSION_PREFIX, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("submission not found".to_string()))?;

    doc["status"] = Value::String(req.status);
    let document = serde_json::to_string(&doc)
        .map_err(|e| ApiError::Internal(format!("failed to serialize submission: {e}")))?;
    state.kv.set(&key, &document).await?;
    Ok(Json(doc))
}

/// Delete one application and its uploaded files (admin, `full`).
#[utoipa::path(
    delete,
    path = "/api/submissions/{id}",
    params(("id" = String, Path, description = "Submission id (millisecond timestamp)")),
    responses(
        (status = 204, description = "Application and attached files deleted"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such application")
    ),
    security(("bearer_token" = [])),
    tag = "submissions"
)]
pub async fn delete_submission_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    auth.require_full()?;
    let (key, doc) = find_by_id_suffix(state.kv.as_ref(), keys::SUBMISSION_PREFIX, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("submission not found".to_string()))?;
    delete_document_with_blobs(&state, &key, &doc).await?;
    Ok(StatusCode::NO_CONTENT)
}
