//! services/api/src/web/users.rs
//!
//! Admin user management: listing all accounts (hashes stripped), creating
//! admin-console accounts keyed by username, and deleting accounts together
//! with their phone index entry.

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

use site_core::{decode_document, keys, Permission, User};

use crate::error::ApiError;
use crate::web::auth::hash_password;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::AppResult;

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// `full` or `readonly`.
    #[serde(default)]
    pub permission: String,
}

/// List every account with password hashes stripped (admin).
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All user documents, without password hashes"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<Value>>> {
    auth.require_admin()?;
    let mut users: Vec<Value> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(keys::USER_PREFIX).await? {
        match decode_document::<Value>(&raw) {
            Ok(mut doc) => {
                if let Some(obj) = doc.as_object_mut() {
                    obj.remove("password_hash");
                }
                users.push(doc);
            }
            Err(e) => warn!(%key, error = %e, "skipping undecodable user"),
        }
    }
    Ok(Json(users))
}

/// Create an admin-console account keyed by username (admin, `full`).
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Missing fields or unknown permission"),
        (status = 403, description = "Requires the full admin role"),
        (status = 409, description = "An account with that username already exists")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    auth.require_full()?;
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }
    let permission = match req.permission.as_str() {
        "full" => Permission::Full,
        "readonly" => Permission::Readonly,
        other => {
            return Err(ApiError::BadRequest(format!(
                "permission must be full or readonly, got '{other}'"
            )))
        }
    };

    let key = keys::user(&req.username);
    if state.kv.get(&key).await?.is_some() {
        return Err(ApiError::Conflict(
            "an account with that username already exists".to_string(),
        ));
    }

    let user = User {
        email: req.username,
        password_hash: hash_password(&req.password)?,
        name: None,
        phone: None,
        permission: Some(permission),
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&user)
        .map_err(|e| ApiError::Internal(format!("failed to serialize user: {e}")))?;
    state.kv.set(&key, &document).await?;

    let mut created = serde_json::to_value(&user)
        .map_err(|e| ApiError::Internal(format!("failed to serialize user: {e}")))?;
    if let Some(obj) = created.as_object_mut() {
        obj.remove("password_hash");
    }
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete an account and its phone index entry (admin, `full`). An admin
/// cannot delete their own account.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "Account email or username")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Attempted to delete own account"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such account")
    ),
    security(("bearer_token" = [])),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    auth.require_full()?;
    if id == auth.email {
        return Err(ApiError::BadRequest(
            "you cannot delete your own account".to_string(),
        ));
    }

    let key = keys::user(&id);
    let raw = state
        .kv
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    state.kv.delete(&key).await?;

    // Drop the phone index entry pointing at this account, if any.
    if let Ok(user) = decode_document::<User>(&raw) {
        if let Some(phone) = user.phone {
            if let Err(e) = state.kv.delete(&keys::phone(&phone)).await {
                warn!(%phone, error = %e, "failed to delete phone index entry");
            }
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
