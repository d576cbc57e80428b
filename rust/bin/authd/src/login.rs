//! Password login: verifies against the configured argon2 hashes and opens a session.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crewkit_auth::credentials::verify_password;
use crewkit_auth::{AuthError, Identity, Role, SessionManager, TokenPair};

use crate::config::UserEntry;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A configured user with its role already parsed.
#[derive(Debug, Clone)]
pub struct Account {
    pub identity: Identity,
    pub password_hash: String,
}

/// Users keyed by email.
#[derive(Debug, Default)]
pub struct Directory {
    by_email: HashMap<String, Account>,
}

impl Directory {
    pub fn from_users(users: &[UserEntry]) -> anyhow::Result<Self> {
        let mut by_email = HashMap::new();
        for user in users {
            let role: Role = user
                .role
                .parse()
                .map_err(|e| anyhow::anyhow!("user {}: {}", user.id, e))?;
            let account = Account {
                identity: Identity::new(&user.id, &user.email, role),
                password_hash: user.password_hash.clone(),
            };
            by_email.insert(user.email.clone(), account);
        }
        Ok(Self { by_email })
    }

    pub fn find(&self, email: &str) -> Option<&Account> {
        self.by_email.get(email)
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }
}

#[derive(Clone)]
pub struct LoginState {
    pub sessions: Arc<SessionManager>,
    pub directory: Arc<Directory>,
}

/// Register login routes, relative to the `/auth` mount point.
pub fn routes(state: LoginState) -> Router {
    Router::new()
        .route("/login", post(login_handler))
        .with_state(state)
}

/// Handle POST /auth/login.
async fn login_handler(
    State(state): State<LoginState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let account = state
        .directory
        .find(&body.email)
        .cloned()
        .ok_or(AuthError::InvalidCredentials)?;

    let hash = account.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&body.password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("password check panicked: {}", e)))?;
    if !verified {
        return Err(AuthError::InvalidCredentials);
    }

    let tokens = state.sessions.create_session(&account.identity).await?;
    info!(user_id = %account.identity.id, "login succeeded");
    Ok(Json(tokens))
}
