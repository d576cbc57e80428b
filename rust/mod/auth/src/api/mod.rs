//! axum adapter: bearer-token middleware, permission layers and the `/auth` routes.
//!
//! ```ignore
//! let app = Router::new()
//!     .nest("/auth", api::routes(state.clone()))
//!     .merge(
//!         Router::new()
//!             .route("/crews", post(create_crew))
//!             .route_layer(from_fn_with_state(Permission::CrewsCreate, api::require_permission))
//!             .route_layer(from_fn_with_state(state, api::auth_middleware)),
//!     );
//! ```

mod me;
mod middleware;
mod session;

use std::sync::Arc;

use axum::Router;

use crate::gate::RequestGate;
use crate::session::SessionManager;

pub use middleware::{auth_middleware, require_permission};

/// Shared state for the auth routes and middleware.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionManager>,
    pub gate: RequestGate,
}

impl AuthState {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        let gate = RequestGate::new(Arc::clone(sessions.issuer()));
        Self { sessions, gate }
    }
}

/// Build the auth router. Routes are relative; the caller nests them under `/auth`.
pub fn routes(state: AuthState) -> Router {
    let protected = Router::new()
        .merge(session::protected_routes())
        .merge(me::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(session::public_routes())
        .merge(protected)
        .with_state(state)
}
