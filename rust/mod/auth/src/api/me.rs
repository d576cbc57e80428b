use axum::extract::Extension;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::api::AuthState;
use crate::model::Identity;
use crate::permission::{catalog, role_permissions};

pub fn routes() -> Router<AuthState> {
    Router::new()
        .route("/me", get(me))
        .route("/permissions", get(permissions))
}

/// GET /auth/me: caller identity plus the permissions its role grants.
async fn me(Extension(caller): Extension<Identity>) -> Json<serde_json::Value> {
    let permissions = role_permissions(caller.role);
    Json(json!({ "user": caller, "permissions": permissions }))
}

/// GET /auth/permissions: the permission catalog.
async fn permissions() -> Json<serde_json::Value> {
    Json(json!({ "items": catalog() }))
}
