//! Auth module: token issuance, role permissions and session lifecycle.
//!
//! # Components
//!
//! - **TokenIssuer** ([`token`]): signs and verifies access/refresh JWTs
//! - **Permissions** ([`permission`]): static role → permission table and role hierarchy
//! - **SessionStore** ([`store`]): async key/value seam, backed by `crewkit-kv`
//! - **SessionManager** ([`session`]): create, validate, refresh (rotating) and invalidate sessions
//! - **RequestGate** ([`gate`]): per-request authentication and permission checks
//! - **api**: axum middleware and `/auth` routes
//!
//! # Usage
//!
//! ```ignore
//! use crewkit_auth::{api, AuthConfig, KvSessionStore, SessionManager, TokenIssuer};
//!
//! let config = AuthConfig::with_secret(secret);
//! let issuer = Arc::new(TokenIssuer::new(&config)?);
//! let store = Arc::new(KvSessionStore::new(kv));
//! let sessions = Arc::new(SessionManager::new(issuer, store, &config));
//! let router = Router::new().nest("/auth", api::routes(api::AuthState::new(sessions)));
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod model;
pub mod permission;
pub mod session;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, GateRejection, StoreError};
pub use gate::{Authenticated, RequestGate};
pub use model::{Identity, Role, TokenPair};
pub use permission::Permission;
pub use session::SessionManager;
pub use store::{KvSessionStore, SessionStore};
pub use token::TokenIssuer;
