//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login (email, username, or
//! 11-digit phone number), and the claims echo used by the admin console.
//! Tokens are HS256 JWTs carried both in the JSON body and in an
//! `auth_token` cookie for admin page navigation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::warn;
use utoipa::ToSchema;

use site_core::{decode_document, keys, Permission, User};

use crate::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

/// Cookie lifetime and JWT expiry, both 7 days.
const TOKEN_TTL_DAYS: i64 = 7;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{11}$").expect("valid phone regex"))
}

//=========================================================================================
// JWT Claims and Token Issuance
//=========================================================================================

/// The claims carried by every issued token. `sub` duplicates `email` for
/// clients that only look at the standard field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
    pub exp: usize,
}

/// Signs a token for the given user record.
pub fn issue_token(user: &User, secret: &str) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user.email.clone(),
        email: user.email.clone(),
        permission: user.permission,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

/// The `Set-Cookie` value that lets the admin page gate see the token on
/// plain browser navigations.
fn auth_cookie(token: &str) -> String {
    format!(
        "auth_token={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        token,
        Duration::days(TOKEN_TTL_DAYS).num_seconds()
    )
}

//=========================================================================================
// Password Hashing
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    // Absent and empty fields both fall through to the handler's 400.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// An email address, an 11-digit phone number, or an admin-console
    /// username.
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

impl AuthResponse {
    fn for_user(user: &User, token: String) -> Self {
        Self {
            token,
            email: user.email.clone(),
            permission: user.permission.map(|p| match p {
                Permission::Full => "full".to_string(),
                Permission::Readonly => "readonly".to_string(),
            }),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Register a new site user.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created, token issued", body = AuthResponse),
        (status = 400, description = "Missing or malformed email/password"),
        (status = 409, description = "A user with that email already exists")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }
    if !email_regex().is_match(&req.email) {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    let key = keys::user(&req.email);
    if state.kv.get(&key).await?.is_some() {
        return Err(ApiError::Conflict(
            "a user with that email already exists".to_string(),
        ));
    }

    let user = User {
        email: req.email.clone(),
        password_hash: hash_password(&req.password)?,
        name: req.name,
        phone: req.phone,
        // Registration never grants an admin role.
        permission: None,
        created_at: Utc::now(),
    };
    let document = serde_json::to_string(&user)
        .map_err(|e| ApiError::Internal(format!("failed to serialize user: {e}")))?;
    state.kv.set(&key, &document).await?;

    // Keep the phone index in step with the user document. The two writes
    // are independent; a failure here leaves the index to the login-time
    // scan fallback.
    if let Some(phone) = &user.phone {
        state.kv.set(&keys::phone(phone), &user.email).await?;
    }

    let token = issue_token(&user, &state.config.jwt_secret)?;
    let cookie = auth_cookie(&token);
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::for_user(&user, token)),
    ))
}

/// Login with email, admin-console username, or 11-digit phone number.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Unknown user or wrong password")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("invalid credentials".to_string());

    // Phone identifiers resolve to an email first; everything else is used
    // as the storage key directly (emails and admin-console usernames).
    let account_id = if !req.identifier.contains('@') && phone_regex().is_match(&req.identifier) {
        resolve_phone_number(&state, &req.identifier)
            .await?
            .ok_or_else(invalid)?
    } else {
        req.identifier.clone()
    };

    let raw = state
        .kv
        .get(&keys::user(&account_id))
        .await?
        .ok_or_else(invalid)?;
    let user: User = decode_document(&raw).map_err(|e| {
        warn!(key = %keys::user(&account_id), error = %e, "stored user document is undecodable");
        invalid()
    })?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = issue_token(&user, &state.config.jwt_secret)?;
    let cookie = auth_cookie(&token);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::for_user(&user, token)),
    ))
}

/// Resolves an 11-digit phone number to the owning user's email.
///
/// The fast path reads the `phone:<number>` index key. When the index entry
/// is missing (older registrations, or a lost index write) the lookup
/// degrades to a full scan of `user:*`, comparing each document's `phone`
/// field, and backfills the index on a hit. Both paths must agree on the
/// result given the same underlying data.
async fn resolve_phone_number(
    state: &AppState,
    phone: &str,
) -> Result<Option<String>, ApiError> {
    if let Some(email) = state.kv.get(&keys::phone(phone)).await? {
        return Ok(Some(email));
    }

    warn!(
        phone,
        "phone index missing; falling back to full user scan (degraded path)"
    );
    for (key, raw) in state.kv.scan_prefix(keys::USER_PREFIX).await? {
        let user: User = match decode_document(&raw) {
            Ok(user) => user,
            Err(e) => {
                warn!(%key, error = %e, "skipping undecodable user document during phone scan");
                continue;
            }
        };
        if user.phone.as_deref() == Some(phone) {
            // Backfill so the next login takes the index path.
            state.kv.set(&keys::phone(phone), &user.email).await?;
            return Ok(Some(user.email));
        }
    }
    Ok(None)
}

/// Echo the authenticated claims; the admin console shell calls this on load.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The caller's claims", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_token" = [])),
    tag = "auth"
)]
pub async fn me_handler(Extension(auth): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        email: auth.email.clone(),
        permission: auth.permission.map(|p| match p {
            Permission::Full => "full".to_string(),
            Permission::Readonly => "readonly".to_string(),
        }),
    })
}
