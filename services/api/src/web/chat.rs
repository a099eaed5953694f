//! services/api/src/web/chat.rs
//!
//! The chat-widget passthrough (streamed straight from the LLM as
//! server-sent events) and the persisted chat-log transcripts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Extension, Json,
};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use site_core::{decode_document, keys, ChatLog, ChatTurn};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::AppResult;

#[derive(Deserialize, ToSchema)]
pub struct ChatTurnBody {
    pub role: String,
    pub content: String,
}

impl From<ChatTurnBody> for ChatTurn {
    fn from(body: ChatTurnBody) -> Self {
        ChatTurn {
            role: body.role,
            content: body.content,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatTurnBody>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateChatLogRequest {
    #[serde(default)]
    pub visitor_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatTurnBody>,
}

/// Stream an assistant answer for the public chat widget.
///
/// Errors before the first token surface as the uniform JSON error; a
/// failure mid-stream terminates the event stream.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "text/event-stream of answer tokens"),
        (status = 400, description = "Empty message list"),
        (status = 502, description = "The LLM API rejected the request")
    ),
    tag = "chat"
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> AppResult<impl IntoResponse> {
    if req.messages.is_empty() {
        return Err(ApiError::BadRequest(
            "messages must not be empty".to_string(),
        ));
    }

    let turns: Vec<ChatTurn> = req.messages.into_iter().map(ChatTurn::from).collect();
    let tokens = state
        .assistant
        .stream_chat(&turns)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let events = tokens.map(|item| match item {
        Ok(token) => Ok(Event::default().data(token)),
        Err(e) => Err(ApiError::Upstream(e.to_string())),
    });
    Ok(Sse::new(events))
}

/// Persist a chat-widget transcript. The widget serves anonymous visitors,
/// so this endpoint is public and takes an optional `visitor_id`.
#[utoipa::path(
    post,
    path = "/api/chat-logs",
    request_body = CreateChatLogRequest,
    responses(
        (status = 201, description = "Transcript stored"),
        (status = 400, description = "Empty message list")
    ),
    tag = "chat"
)]
pub async fn create_chat_log_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChatLogRequest>,
) -> AppResult<impl IntoResponse> {
    if req.messages.is_empty() {
        return Err(ApiError::BadRequest(
            "messages must not be empty".to_string(),
        ));
    }

    let log = ChatLog {
        id: Uuid::new_v4(),
        visitor_id: req.visitor_id,
        messages: req.messages.into_iter().map(ChatTurn::from).collect(),
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&log)
        .map_err(|e| ApiError::Internal(format!("failed to serialize chat log: {e}")))?;
    state.kv.set(&keys::chat_log(log.id), &document).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// List all stored transcripts (admin).
#[utoipa::path(
    get,
    path = "/api/chat-logs",
    responses(
        (status = 200, description = "All transcripts, newest first"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_token" = [])),
    tag = "chat"
)]
pub async fn list_chat_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<ChatLog>>> {
    auth.require_admin()?;
    let mut logs: Vec<ChatLog> = Vec::new();
    for (key, raw) in state.kv.scan_prefix(keys::CHAT_LOG_PREFIX).await? {
        match decode_document::<ChatLog>(&raw) {
            Ok(log) => logs.push(log),
            Err(e) => warn!(%key, error = %e, "skipping undecodable chat log"),
        }
    }
    logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(logs))
}

/// Delete one transcript (admin, `full`).
#[utoipa::path(
    delete,
    path = "/api/chat-logs/{id}",
    params(("id" = Uuid, Path, description = "Chat log id")),
    responses(
        (status = 204, description = "Transcript deleted"),
        (status = 403, description = "Requires the full admin role"),
        (status = 404, description = "No such transcript")
    ),
    security(("bearer_token" = [])),
    tag = "chat"
)]
pub async fn delete_chat_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    auth.require_full()?;
    let key = keys::chat_log(id);
    if state.kv.get(&key).await?.is_none() {
        return Err(ApiError::NotFound("chat log not found".to_string()));
    }
    state.kv.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
