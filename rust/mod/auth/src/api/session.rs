//! Token refresh, logout and session freshness endpoints.

use axum::extract::{Extension, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::debug;

use crate::api::AuthState;
use crate::error::AuthError;
use crate::model::{Identity, LogoutRequest, RefreshRequest, TokenPair};
use crate::token::TokenIssuer;

pub fn public_routes() -> Router<AuthState> {
    Router::new().route("/token/refresh", post(refresh))
}

pub fn protected_routes() -> Router<AuthState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/session", get(session_status))
}

/// POST /auth/token/refresh: exchange a refresh token for a new pair.
///
/// The token must verify before the store is consulted. Unknown, reused or
/// revoked tokens get 401 and the client must log in again.
async fn refresh(
    State(state): State<AuthState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    state
        .sessions
        .issuer()
        .verify_refresh_token(&body.refresh_token)?;

    match state.sessions.refresh_session(&body.refresh_token).await? {
        Some(tokens) => Ok(Json(tokens)),
        None => Err(AuthError::SessionNotFound("refresh".into())),
    }
}

/// POST /auth/logout: end the caller's session; revoke the refresh token if given.
///
/// The body is optional. A refresh token issued to someone else is left alone.
async fn logout(
    State(state): State<AuthState>,
    Extension(caller): Extension<Identity>,
    body: Option<Json<LogoutRequest>>,
) -> Result<StatusCode, AuthError> {
    state.sessions.invalidate_session(&caller.id).await?;
    let refresh_token = body.and_then(|Json(body)| body.refresh_token);
    if let Some(refresh_token) = refresh_token.as_deref() {
        state
            .sessions
            .invalidate_refresh_token_for(&caller.id, refresh_token)
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/session: whether the presented access token is still the live one.
async fn session_status(
    State(state): State<AuthState>,
    Extension(caller): Extension<Identity>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = TokenIssuer::extract_token(header)?;
    let active = state.sessions.validate_session(&caller.id, token).await?;
    debug!(user_id = %caller.id, active, "session status");
    Ok(Json(json!({ "active": active })))
}
