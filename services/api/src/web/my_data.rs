//! services/api/src/web/my_data.rs
//!
//! The JWT-gated aggregation endpoint: one response collecting the caller's
//! applications, questionnaires, and feedback, plus per-item deletion.
//!
//! Deletion verifies ownership by structured comparison of the stored
//! document's `email` field against the authenticated email. The original
//! deployment matched the email as a substring of the storage key, which is
//! spoofable when one email is a substring of another; that check was not
//! carried forward.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use site_core::{decode_document, document_email, keys};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::{delete_document_with_blobs, find_by_id_suffix, AppResult};

/// Maps the URL segment to the storage prefix for that kind of record.
fn prefix_for_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "submissions" => Some(keys::SUBMISSION_PREFIX),
        "questionnaires" => Some(keys::QUESTIONNAIRE_PREFIX),
        "feedback" => Some(keys::FEEDBACK_PREFIX),
        _ => None,
    }
}

async fn scan_own(state: &AppState, prefix: &str, email: &str) -> Result<Vec<Value>, ApiError> {
    // The email is embedded in the key, so the caller's records are one
    // prefix scan each.
    let scoped = format!("{prefix}{email}:");
    let mut items: Vec<Value> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(&scoped).await? {
        match decode_document::<Value>(&raw) {
            Ok(doc) => items.push(doc),
            Err(e) => warn!(%key, error = %e, "skipping undecodable document in my-data"),
        }
    }
    Ok(items)
}

/// Aggregate everything the caller has submitted.
#[utoipa::path(
    get,
    path = "/api/my-data",
    responses(
        (status = 200, description = "The caller's submissions, questionnaires, and feedback"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_token" = [])),
    tag = "my-data"
)]
pub async fn get_my_data_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let submissions = scan_own(&state, keys::SUBMISSION_PREFIX, &auth.email).await?;
    let questionnaires = scan_own(&state, keys::QUESTIONNAIRE_PREFIX, &auth.email).await?;
    let feedback = scan_own(&state, keys::FEEDBACK_PREFIX, &auth.email).await?;
    Ok(Json(json!({
        "submissions": submissions,
        "questionnaires": questionnaires,
        "feedback": feedback,
    })))
}

/// Delete one of the caller's own records, with blob fan-out.
#[utoipa::path(
    delete,
    path = "/api/my-data/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "One of: submissions, questionnaires, feedback"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 204, description = "Record and attached files deleted"),
        (status = 400, description = "Unknown kind"),
        (status = 403, description = "The record belongs to another user"),
        (status = 404, description = "No such record")
    ),
    security(("bearer_token" = [])),
    tag = "my-data"
)]
pub async fn delete_my_data_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let prefix = prefix_for_kind(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown kind '{kind}'")))?;

    let (key, doc) = find_by_id_suffix(state.kv.as_ref(), prefix, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("record not found".to_string()))?;

    if document_email(&doc) != Some(auth.email.as_str()) {
        return Err(ApiError::Forbidden(
            "this record belongs to another user".to_string(),
        ));
    }

    delete_document_with_blobs(&state, &key, &doc).await?;
    Ok(StatusCode::NO_CONTENT)
}
