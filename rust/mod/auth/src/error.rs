use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crewkit_kv::KVError;

use crate::permission::Permission;

// ── Error codes ─────────────────────────────────────────────────────

/// Stable, machine-readable identifiers for the JSON error body
/// `{"code": "...", "message": "..."}`.
pub mod error_code {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── StoreError ──────────────────────────────────────────────────────

/// Failure of the backing session store. Always propagated, never treated
/// as a missing record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),

    #[error("store serialization: {0}")]
    Serialization(String),
}

impl From<KVError> for StoreError {
    fn from(e: KVError) -> Self {
        match e {
            KVError::Storage(m) => StoreError::Backend(m),
            KVError::Serialization(m) => StoreError::Serialization(m),
        }
    }
}

// ── AuthError ───────────────────────────────────────────────────────

/// Auth service error type.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No Authorization header, or not of the form `Bearer <token>`.
    #[error("missing bearer token")]
    MissingToken,

    /// Bad signature, malformed payload or expired, for either token kind.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Unknown login or wrong password. The two are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A session or refresh record lookup missed.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Rejected configuration; raised only at construction time.
    #[error("config: {0}")]
    Config(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::InvalidCredentials
            | AuthError::SessionNotFound(_) => error_code::UNAUTHENTICATED,
            AuthError::Store(_) => error_code::STORAGE_ERROR,
            AuthError::Config(_) | AuthError::Internal(_) => error_code::INTERNAL,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::InvalidCredentials
            | AuthError::SessionNotFound(_) => StatusCode::UNAUTHORIZED,
            AuthError::Store(_) | AuthError::Config(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to clients. Token failures collapse into one
    /// message so callers cannot probe which check failed.
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => "Unauthorized",
            _ => "internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "auth request failed");
        } else {
            tracing::debug!(error = %self, "auth request rejected");
        }
        let body = serde_json::json!({
            "code": self.error_code(),
            "message": self.public_message(),
        });
        (status, axum::Json(body)).into_response()
    }
}

// ── GateRejection ───────────────────────────────────────────────────

/// Outcome of a failed request-gate check.
///
/// Authentication failure and authorization denial are distinct: the
/// transport maps them to 401 and 403 respectively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl GateRejection {
    pub fn forbidden(permission: Permission) -> Self {
        GateRejection::Forbidden(permission.as_str().to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GateRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateRejection::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            GateRejection::Unauthenticated => (error_code::UNAUTHENTICATED, "Unauthorized"),
            GateRejection::Forbidden(_) => (error_code::PERMISSION_DENIED, "Forbidden"),
        };
        let body = serde_json::json!({ "code": code, "message": message });
        (self.status_code(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_share_status_and_message() {
        let errors = [
            AuthError::MissingToken,
            AuthError::InvalidToken("ExpiredSignature".into()),
            AuthError::InvalidToken("InvalidSignature".into()),
            AuthError::InvalidCredentials,
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.error_code(), "UNAUTHENTICATED");
            assert_eq!(err.public_message(), "Unauthorized");
        }
    }

    #[test]
    fn store_error_is_server_error() {
        let err = AuthError::from(StoreError::Backend("connection reset".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn kv_error_maps_to_store_error() {
        let err = StoreError::from(KVError::Serialization("bad envelope".into()));
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn gate_rejection_status() {
        assert_eq!(
            GateRejection::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GateRejection::forbidden(Permission::UsersManage)
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }
}
