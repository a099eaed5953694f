//! services/api/src/web/mod.rs
//!
//! Route handlers (one module per resource), the auth middleware, and the
//! router assembly shared by the binary and the contract tests. The small
//! helpers at the bottom implement the storage patterns every resource
//! repeats: lookup by id suffix and delete-with-blob-fan-out.

pub mod articles;
pub mod auth;
pub mod chat;
pub mod feedback;
pub mod middleware;
pub mod my_data;
pub mod questionnaires;
pub mod rest;
pub mod state;
pub mod submissions;
pub mod uploads;
pub mod users;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::Value;
use tracing::warn;

use site_core::{decode_document, document_file_urls, BlobStore, KvStore};

use crate::error::ApiError;
use state::AppState;

/// The result type every handler returns.
pub type AppResult<T> = Result<T, ApiError>;

/// Assembles the full application router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/articles", get(articles::list_articles_handler))
        .route("/api/articles/{id}", get(articles::get_article_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/chat-logs", post(chat::create_chat_log_handler))
        .route("/api/image-proxy", get(uploads::image_proxy_handler));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/articles", post(articles::create_article_handler))
        .route(
            "/api/articles/{id}",
            delete(articles::delete_article_handler),
        )
        .route("/api/chat-logs", get(chat::list_chat_logs_handler))
        .route(
            "/api/chat-logs/{id}",
            delete(chat::delete_chat_log_handler),
        )
        .route(
            "/api/customer-feedback",
            post(feedback::create_feedback_handler).get(feedback::list_feedback_handler),
        )
        .route(
            "/api/customer-feedback/{id}",
            delete(feedback::delete_feedback_handler),
        )
        .route(
            "/api/questionnaires",
            post(questionnaires::create_questionnaire_handler)
                .get(questionnaires::list_questionnaires_handler),
        )
        .route(
            "/api/questionnaires/{id}",
            delete(questionnaires::delete_questionnaire_handler),
        )
        .route(
            "/api/submissions",
            post(submissions::create_submission_handler)
                .get(submissions::list_submissions_handler),
        )
        .route(
            "/api/submissions/{id}/status",
            put(submissions::update_submission_status_handler),
        )
        .route(
            "/api/submissions/{id}",
            delete(submissions::delete_submission_handler),
        )
        .route("/api/my-data", get(my_data::get_my_data_handler))
        .route(
            "/api/my-data/{kind}/{id}",
            delete(my_data::delete_my_data_handler),
        )
        .route(
            "/api/upload",
            post(uploads::upload_handler).delete(uploads::delete_uploads_handler),
        )
        .route(
            "/api/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route("/api/users/{id}", delete(users::delete_user_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // The explicit fallback makes the admin page gate run for page
        // navigations that no API route matches.
        .fallback(not_found_handler)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_page_gate,
        ))
        .with_state(state)
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("not found".to_string())
}

//=========================================================================================
// Shared Storage Helpers
//=========================================================================================

/// Locates a document whose key ends with `:<id>` under the given prefix.
/// The store has no secondary indexes, so this is a prefix scan.
pub(crate) async fn find_by_id_suffix(
    kv: &dyn KvStore,
    prefix: &str,
    id: &str,
) -> Result<Option<(String, Value)>, ApiError> {
    let suffix = format!(":{id}");
    for (key, raw) in kv.scan_prefix(prefix).await? {
        if key.ends_with(&suffix) {
            let doc = decode_document::<Value>(&raw).map_err(|e| {
                ApiError::Internal(format!("stored document {key} is undecodable: {e}"))
            })?;
            return Ok(Some((key, doc)));
        }
    }
    Ok(None)
}

/// Deletes one blob, logging and swallowing failures. Returns whether the
/// delete succeeded.
pub(crate) async fn delete_blob_best_effort(blobs: &dyn BlobStore, url: &str) -> bool {
    match blobs.delete(url).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%url, error = %e, "failed to delete blob; record removed but blob remains");
            false
        }
    }
}

/// Removes a document and then fans out to delete every file URL it
/// references. The deletions are sequential with no rollback: a blob
/// failure after the KV delete leaves an orphaned blob, which is logged
/// and accepted.
pub(crate) async fn delete_document_with_blobs(
    state: &AppState,
    key: &str,
    doc: &Value,
) -> Result<(), ApiError> {
    state.kv.delete(key).await?;
    for url in document_file_urls(doc) {
        delete_blob_best_effort(state.blobs.as_ref(), &url).await;
    }
    Ok(())
}
