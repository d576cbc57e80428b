use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::AuthState;
use crate::error::GateRejection;
use crate::gate::RequestGate;
use crate::model::Identity;
use crate::permission::Permission;

/// Bearer-token authentication middleware.
///
/// Verifies `Authorization: Bearer <token>` and stores the caller's
/// [`Identity`] as a request extension. Any failure is a uniform 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let caller = state.gate.authenticate(header)?;

    request.extensions_mut().insert(caller.into_identity());
    Ok(next.run(request).await)
}

/// Permission middleware. Install with
/// `from_fn_with_state(Permission::X, require_permission)` inside
/// [`auth_middleware`]; it reads the identity left by that middleware and
/// never looks at the token.
pub async fn require_permission(
    State(permission): State<Permission>,
    request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    RequestGate::authorize(request.extensions().get::<Identity>(), permission)?;
    Ok(next.run(request).await)
}
