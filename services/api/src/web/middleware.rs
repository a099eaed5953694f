//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.
//!
//! API routes under `/api/*` authenticate with a Bearer token (falling back
//! to the `auth_token` cookie) and fail with 401 JSON. Admin page
//! navigations under `/admin/*` are gated separately: an absent or invalid
//! cookie redirects the browser to the login page at `/admin`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::warn;

use site_core::Permission;

use crate::error::ApiError;
use crate::web::auth::Claims;
use crate::web::state::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub permission: Option<Permission>,
}

impl AuthUser {
    /// Admin endpoints: any admin role may read.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.permission.is_some() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin access required".to_string()))
        }
    }

    /// Mutating admin endpoints: only the `full` role.
    pub fn require_full(&self) -> Result<(), ApiError> {
        if self.permission == Some(Permission::Full) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "full admin permission required".to_string(),
            ))
        }
    }
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn cookie_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|c| {
                let c = c.trim();
                c.strip_prefix("auth_token=")
            })
        })
        .map(str::to_string)
}

/// Verifies an HS256 token against the shared secret and returns its claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "invalid auth token");
        ApiError::Unauthorized("invalid or expired token".to_string())
    })
}

/// Middleware that authenticates the request and inserts an [`AuthUser`]
/// into request extensions for handlers to use. Returns 401 when the token
/// is missing or invalid.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .or_else(|| cookie_token(req.headers()))
        .ok_or_else(|| ApiError::Unauthorized("missing auth token".to_string()))?;

    let claims = decode_token(&token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(AuthUser {
        email: claims.email,
        permission: claims.permission,
    });

    Ok(next.run(req).await)
}

/// Middleware gating admin page navigations.
///
/// Paths matching `/admin/*` — excluding `/api/*` and the login page
/// `/admin` itself — require a valid `auth_token` cookie; otherwise the
/// browser is redirected to `/admin`. API routes pass through untouched and
/// rely on [`require_auth`] instead.
pub async fn admin_page_gate(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    let gated = path.starts_with("/admin/") && !path.starts_with("/api/");
    if !gated {
        return next.run(req).await;
    }

    let authenticated = cookie_token(req.headers())
        .and_then(|token| decode_token(&token, &state.config.jwt_secret).ok())
        .is_some();
    if authenticated {
        next.run(req).await
    } else {
        Redirect::to("/admin").into_response()
    }
}
