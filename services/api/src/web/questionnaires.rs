//! services/api/src/web/questionnaires.rs
//!
//! Questionnaire submissions: authenticated create, admin list, admin
//! delete with blob fan-out. The answers object is shaped entirely by the
//! front end and stored as-is.

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
use uuid::Uuid;

use site_core::{decode_document, keys, Questionnaire};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::{delete_document_with_blobs, find_by_id_suffix, AppResult};

#[derive(Deserialize, ToSchema)]
pub struct CreateQuestionnaireRequest {
    /// Omitted answers decode as `null` and fail the object check below.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub answers: Value,
    #[serde(default)]
    pub file_urls: Vec<String>,
}

/// Submit questionnaire answers (any authenticated user).
#[utoipa::path(
    post,
    path = "/api/questionnaires",
    request_body = CreateQuestionnaireRequest,
    responses(
        (status = 201, description = "Questionnaire stored"),
        (status = 400, description = "Answers must be a JSON object")
    ),
    security(("bearer_token" = [])),
    tag = "questionnaires"
)]
pub async fn create_questionnaire_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateQuestionnaireRequest>,
) -> AppResult<impl IntoResponse> {
    if !req.answers.is_object() || req.answers.as_object().is_some_and(|o| o.is_empty()) {
        return Err(ApiError::BadRequest(
            "answers must be a non-empty object".to_string(),
        ));
    }

    let questionnaire = Questionnaire {
        id: Uuid::new_v4(),
        email: auth.email.clone(),
        answers: req.answers,
        file_urls: req.file_urls,
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&questionnaire)
        .map_err(|e| ApiError::Internal(format!("failed to serialize questionnaire: {e}")))?;
    state
        .kv
        .set(
            &keys::questionnaire(&auth.email, questionnaire.id),
            &document,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(questionnaire)))
}

/// List all questionnaires (admin).
#[utoipa::path(
    get,
    path = "/api/questionnaires",
    responses(
        (status = 200, description = "All questionnaires, newest first"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_token" = [])),
    tag = "questionnaires"
)]
pub async fn list_questionnaires_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<Questionnaire>>> {
    auth.require_admin()?;
    let mut items: Vec<Questionnaire> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(keys::QUESTIONNAIRE_PREFIX).await? {
        match decode_document::<Questionnaire>(&raw) {
            Ok(item) => items.push(item),
            Err(e) => warn!(%key, error = %e, "skipping undecodable questionnaire"),
        }
    }
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(items))
}

/// Delete one questionnaire and its uploaded files (admin, `full`).
#[utoipa::path(
    delete,
    path = "/api/questionnaires/{id}",
    params(("id" = String, Path, description = "Questionnaire id")),
    responses(
        (status = 204, description = "Questionnaire and attached files deleted"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such questionnaire")
    ),
    security(("bearer_token" = [])),
    tag = "questionnaires"
)]
pub async fn delete_questionnaire_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    auth.require_full()?;
    let (key, doc) = find_by_id_suffix(state.kv.as_ref(), keys::QUESTIONNAIRE_PREFIX, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("questionnaire not found".to_string()))?;
    delete_document_with_blobs(&state, &key, &doc).await?;
    Ok(StatusCode::NO_CONTENT)
}
