//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        HttpBlobStore, MemoryBlobStore, MemoryKvStore, OpenAiAssistantAdapter, RedisKvStore,
    },
    config::{BlobBackend, Config, KvBackend},
    error::ApiError,
    web::{auth::hash_password, rest::ApiDoc, router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use chrono::Utc;
use site_core::{keys, AssistantService, BlobStore, KvStore, Permission, User};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            config.log_level.to_string(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect the Storage Adapters ---
    let kv: Arc<dyn KvStore> = match config.kv_backend {
        KvBackend::Redis => {
            let url = config
                .redis_url
                .as_ref()
                .ok_or_else(|| ApiError::Internal("REDIS_URL is required".to_string()))?;
            info!("Connecting to the managed KV store...");
            Arc::new(RedisKvStore::connect(url).await?)
        }
        KvBackend::Memory => {
            warn!("KV_BACKEND=memory: all data is lost on restart");
            Arc::new(MemoryKvStore::new())
        }
    };

    let http = reqwest::Client::new();
    let blobs: Arc<dyn BlobStore> = match config.blob_backend {
        BlobBackend::Http => {
            let api_url = config
                .blob_api_url
                .clone()
                .ok_or_else(|| ApiError::Internal("BLOB_API_URL is required".to_string()))?;
            let token = config
                .blob_rw_token
                .clone()
                .ok_or_else(|| ApiError::Internal("BLOB_RW_TOKEN is required".to_string()))?;
            Arc::new(HttpBlobStore::new(http.clone(), api_url, token))
        }
        BlobBackend::Memory => {
            warn!("BLOB_BACKEND=memory: uploaded files are lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
    };

    // --- 3. Initialize the Assistant Adapter ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let assistant: Arc<dyn AssistantService> = Arc::new(OpenAiAssistantAdapter::new(
        openai_client,
        config.chat_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        kv,
        blobs,
        assistant,
        http,
        config: config.clone(),
    });

    // --- 5. Seed the Bootstrap Admin (optional) ---
    seed_admin(&app_state).await?;

    // --- 6. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = router(app_state)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Creates the bootstrap admin account from `ADMIN_EMAIL`/`ADMIN_PASSWORD`
/// when both are set and the account does not exist yet.
async fn seed_admin(state: &AppState) -> Result<(), ApiError> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.as_ref(),
        state.config.admin_password.as_ref(),
    ) else {
        return Ok(());
    };

    let key = keys::user(email);
    if state.kv.get(&key).await?.is_some() {
        return Ok(());
    }

    let admin = User {
        email: email.clone(),
        password_hash: hash_password(password)?,
        name: None,
        phone: None,
        permission: Some(Permission::Full),
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&admin)
        .map_err(|e| ApiError::Internal(format!("failed to serialize admin user: {e}")))?;
    state.kv.set(&key, &document).await?;
    info!(%email, "seeded bootstrap admin account");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, stopping server");
}
