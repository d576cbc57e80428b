//! Per-request authentication and authorization, independent of any HTTP framework.
//!
//! ```ignore
//! let caller = gate.authenticate(headers.get("authorization"))?;
//! caller.require(Permission::CrewsCreate)?.require(Permission::AgentsCreate)?;
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::GateRejection;
use crate::model::Identity;
use crate::permission::{has_permission, Permission};
use crate::token::TokenIssuer;

/// Verifies bearer tokens and checks permissions.
#[derive(Clone)]
pub struct RequestGate {
    issuer: Arc<TokenIssuer>,
}

/// A request whose access token has been verified.
///
/// Permission checks run against the identity captured here, so any number
/// of them can follow one authentication without touching the token again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    identity: Identity,
}

impl RequestGate {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }

    /// Verify the `Authorization` header value.
    ///
    /// Every failure, whether the header is missing or the token is bad,
    /// collapses into [`GateRejection::Unauthenticated`]; the reason is only logged.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Authenticated, GateRejection> {
        let token = TokenIssuer::extract_token(authorization).map_err(|e| {
            warn!(reason = %e, "authentication failed");
            GateRejection::Unauthenticated
        })?;
        let identity = self.issuer.verify_access_token(token).map_err(|e| {
            warn!(reason = %e, "authentication failed");
            GateRejection::Unauthenticated
        })?;
        Ok(Authenticated { identity })
    }

    /// Deny unless an identity is present and its role holds `permission`.
    pub fn authorize(identity: Option<&Identity>, permission: Permission) -> Result<(), GateRejection> {
        match identity {
            Some(identity) if permission.allows(identity.role) => Ok(()),
            Some(identity) => {
                debug!(user_id = %identity.id, role = %identity.role, %permission, "permission denied");
                Err(GateRejection::forbidden(permission))
            }
            None => Err(GateRejection::forbidden(permission)),
        }
    }

    /// [`RequestGate::authorize`] for a permission given by wire name.
    /// Names outside the catalog are always denied.
    pub fn authorize_named(identity: Option<&Identity>, permission: &str) -> Result<(), GateRejection> {
        match identity {
            Some(identity) if has_permission(identity.role, permission) => Ok(()),
            _ => Err(GateRejection::Forbidden(permission.to_string())),
        }
    }
}

impl Authenticated {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn into_identity(self) -> Identity {
        self.identity
    }

    /// Check one permission; chainable.
    pub fn require(&self, permission: Permission) -> Result<&Self, GateRejection> {
        RequestGate::authorize(Some(&self.identity), permission)?;
        Ok(self)
    }

    /// Check several permissions; fails on the first one missing.
    pub fn require_all(&self, permissions: &[Permission]) -> Result<&Self, GateRejection> {
        permissions.iter().try_fold(self, |caller, p| caller.require(*p))
    }
}
