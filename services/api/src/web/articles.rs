//! services/api/src/web/articles.rs
//!
//! Article publishing: public list/read, admin create/delete.

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

use site_core::{decode_document, keys, Article};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::{delete_blob_best_effort, AppResult};

#[derive(Deserialize, ToSchema)]
pub struct CreateArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

/// List all published articles, newest first.
#[utoipa::path(
    get,
    path = "/api/articles",
    responses((status = 200, description = "All articles, newest first")),
    tag = "articles"
)]
pub async fn list_articles_handler(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Article>>> {
    let mut articles: Vec<Article> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(keys::ARTICLE_PREFIX).await? {
        match decode_document::<Article>(&raw) {
            Ok(article) => articles.push(article),
            Err(e) => warn!(%key, error = %e, "skipping undecodable article"),
        }
    }
    articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(articles))
}

/// Read a single article.
#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "The article"),
        (status = 404, description = "No such article")
    ),
    tag = "articles"
)]
pub async fn get_article_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Article>> {
    let raw = state
        .kv
        .get(&keys::article(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
    let article = decode_document(&raw)
        .map_err(|e| ApiError::Internal(format!("stored article is undecodable: {e}")))?;
    Ok(Json(article))
}

/// Publish a new article (admin, `full`).
#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created"),
        (status = 400, description = "Missing title or content"),
        (status = 403, description = "Requires the full admin role")
    ),
    security(("bearer_token" = [])),
    tag = "articles"
)]
pub async fn create_article_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateArticleRequest>,
) -> AppResult<impl IntoResponse> {
    auth.require_full()?;
    if req.title.trim().is_empty() || req.content.is_empty() {
        return Err(ApiError::BadRequest(
            "title and content are required".to_string(),
        ));
    }

    let article = Article {
        id: Uuid::new_v4(),
        title: req.title,
        content: req.content,
        cover_image_url: req.cover_image_url,
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&article)
        .map_err(|e| ApiError::Internal(format!("failed to serialize article: {e}")))?;
    state.kv.set(&keys::article(article.id), &document).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// Delete an article and its cover image (admin, `full`).
#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such article")
    ),
    security(("bearer_token" = [])),
    tag = "articles"
)]
pub async fn delete_article_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_full()?;
    let key = keys::article(id);
    let raw = state
        .kv
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;

    state.kv.delete(&key).await?;

    // Cover image cleanup comes second and is best-effort; there is no
    // rollback if the blob delete fails.
    if let Ok(article) = decode_document::<Article>(&raw) {
        if let Some(url) = article.cover_image_url {
            delete_blob_best_effort(state.blobs.as_ref(), &url).await;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
