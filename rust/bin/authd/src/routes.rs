//! Route registration: the auth module routes, login, and system endpoints.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crewkit_auth::api::{self, AuthState};

use crate::login::{self, LoginState};

/// Build the complete router.
pub fn build_router(auth: AuthState, login: LoginState) -> Router {
    let auth_routes = api::routes(auth).merge(login::routes(login));

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .nest("/auth", auth_routes)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "crewkit-authd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
