//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification and the health
//! endpoint. The individual resource handlers live in their own modules.

use axum::Json;
use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::{articles, auth, chat, feedback, my_data, questionnaires, submissions, uploads, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        articles::list_articles_handler,
        articles::get_article_handler,
        articles::create_article_handler,
        articles::delete_article_handler,
        chat::chat_handler,
        chat::create_chat_log_handler,
        chat::list_chat_logs_handler,
        chat::delete_chat_log_handler,
        feedback::create_feedback_handler,
        feedback::list_feedback_handler,
        feedback::delete_feedback_handler,
        questionnaires::create_questionnaire_handler,
        questionnaires::list_questionnaires_handler,
        questionnaires::delete_questionnaire_handler,
        submissions::create_submission_handler,
        submissions::list_submissions_handler,
        submissions::update_submission_status_handler,
        submissions::delete_submission_handler,
        my_data::get_my_data_handler,
        my_data::delete_my_data_handler,
        uploads::upload_handler,
        uploads::delete_uploads_handler,
        uploads::image_proxy_handler,
        users::list_users_handler,
        users::create_user_handler,
        users::delete_user_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::MeResponse,
            articles::CreateArticleRequest,
            chat::ChatTurnBody,
            chat::ChatRequest,
            chat::CreateChatLogRequest,
            feedback::CreateFeedbackRequest,
            questionnaires::CreateQuestionnaireRequest,
            submissions::CreateSubmissionRequest,
            submissions::UpdateStatusRequest,
            uploads::UploadResponse,
            uploads::DeleteUploadsRequest,
            uploads::DeleteUploadsResponse,
            users::CreateUserRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Marketing Site API", description = "Content publishing and customer-intake endpoints for the marketing site.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
