//! services/api/src/web/feedback.rs
//!
//! Customer feedback: authenticated create, admin list, admin delete with
//! blob fan-out.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use site_core::{decode_document, keys, Feedback};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::{delete_document_with_blobs, find_by_id_suffix, AppResult};

#[derive(Deserialize, ToSchema)]
pub struct CreateFeedbackRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub file_urls: Vec<String>,
}

/// Submit feedback (any authenticated user).
#[utoipa::path(
    post,
    path = "/api/customer-feedback",
    request_body = CreateFeedbackRequest,
    responses(
        (status = 201, description = "Feedback stored"),
        (status = 400, description = "Missing content")
    ),
    security(("bearer_token" = [])),
    tag = "feedback"
)]
pub async fn create_feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateFeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content is required".to_string()));
    }

    let feedback = Feedback {
        id: Uuid::new_v4(),
        email: auth.email.clone(),
        content: req.content,
        rating: req.rating,
        file_urls: req.file_urls,
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&feedback)
        .map_err(|e| ApiError::Internal(format!("failed to serialize feedback: {e}")))?;
    state
        .kv
        .set(&keys::feedback(&auth.email, feedback.id), &document)
        .await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// List all feedback (admin).
#[utoipa::path(
    get,
    path = "/api/customer-feedback",
    responses(
        (status = 200, description = "All feedback, newest first"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_token" = [])),
    tag = "feedback"
)]
pub async fn list_feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<Feedback>>> {
    auth.require_admin()?;
    let mut items: Vec<Feedback> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(keys::FEEDBACK_PREFIX).await? {
        match decode_document::<Feedback>(&raw) {
            Ok(item) => items.push(item),
            Err(e) => warn!(%key, error = %e, "skipping undecodable feedback"),
        }
    }
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(items))
}

/// Delete one feedback record and its uploaded files (admin, `full`).
#[utoipa::path(
    delete,
    path = "/api/customer-feedback/{id}",
    params(("id" = String, Path, description = "Feedback id")),
    responses(
        (status = 204, description = "Feedback and attached files deleted"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such feedback")
    ),
    security(("bearer_token" = [])),
    tag = "feedback"
)]
pub async fn delete_feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    auth.require_full()?;
    let (key, doc) = find_by_id_suffix(state.kv.as_ref(), keys::FEEDBACK_PREFIX, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("feedback not found".to_string()))?;
    delete_document_with_blobs(&state, &key, &doc).await?;
    Ok(StatusCode::NO_CONTENT)
}
