//! Token issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with the same secret and
//! told apart by payload shape. Signatures are checked by `jsonwebtoken`;
//! expiry is checked here against the injected [`Clock`] so that tests can
//! move time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::model::{AccessClaims, Identity, RefreshClaims, TokenPair};

/// Signs and verifies tokens. Holds no session state.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: i64,
    refresh_ttl: i64,
    clock: Arc<dyn Clock>,
    last_version: AtomicI64,
}

#[derive(Deserialize)]
struct Expiry {
    exp: i64,
}

impl TokenIssuer {
    /// Build an issuer on the wall clock. Fails on an empty secret or a bad expiry.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl: config.access_lifetime_secs()?,
            refresh_ttl: config.refresh_lifetime_secs()?,
            clock,
            last_version: AtomicI64::new(0),
        })
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    /// Mint an access/refresh pair for `identity`.
    pub fn generate_tokens(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let iat = now.timestamp();

        let access = AccessClaims {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat,
            exp: iat + self.access_ttl,
        };
        let refresh = RefreshClaims {
            user_id: identity.id.clone(),
            token_version: self.next_version(now.timestamp_millis()),
            iat,
            exp: iat + self.refresh_ttl,
        };

        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims: AccessClaims = self.verify(token)?;
        Ok(claims.identity())
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        self.verify(token)
    }

    /// Pull the token out of an `Authorization` header value.
    ///
    /// Only the exact two-part form `Bearer <token>` is accepted.
    pub fn extract_token(header: Option<&str>) -> Result<&str, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let mut parts = header.split(' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
            _ => Err(AuthError::MissingToken),
        }
    }

    /// Decode a token's payload without checking its signature or expiry.
    pub fn decode<T: DeserializeOwned>(token: &str) -> Result<T, AuthError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// True if the token is past its `exp`, or cannot be decoded at all.
    pub fn is_expired(&self, token: &str) -> bool {
        match Self::decode::<Expiry>(token) {
            Ok(claims) => claims.exp <= self.clock.now().timestamp(),
            Err(_) => true,
        }
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT encode failed: {}", e)))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let data = jsonwebtoken::decode::<serde_json::Value>(
            token,
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let exp: Expiry = serde_json::from_value(data.claims.clone())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if exp.exp <= self.clock.now().timestamp() {
            debug!(exp = exp.exp, "token expired");
            return Err(AuthError::InvalidToken("token expired".into()));
        }

        serde_json::from_value(data.claims).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Millisecond timestamp, bumped past the previous value if the clock
    /// has not moved, so no two refresh tokens share a version.
    fn next_version(&self, now_ms: i64) -> i64 {
        let prev = self
            .last_version
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_ms.max(prev + 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Role;

    fn start() -> DateTime<chrono::Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn issuer_with(config: AuthConfig) -> (Arc<ManualClock>, TokenIssuer) {
        let clock = Arc::new(ManualClock::new(start()));
        let issuer = TokenIssuer::with_clock(&config, clock.clone()).unwrap();
        (clock, issuer)
    }

    fn issuer() -> (Arc<ManualClock>, TokenIssuer) {
        let mut config = AuthConfig::with_secret("test-secret");
        config.jwt_expiry = "15m".into();
        config.refresh_token_expiry = "7d".into();
        issuer_with(config)
    }

    fn alice() -> Identity {
        Identity::new("u1", "a@b.com", Role::User)
    }

    #[test]
    fn access_token_round_trip() {
        let (_clock, issuer) = issuer();
        for identity in [
            alice(),
            Identity::new("admin-7", "root@crew.ai", Role::Admin),
            Identity::new("m", "", Role::Moderator),
        ] {
            let pair = issuer.generate_tokens(&identity).unwrap();
            assert_eq!(issuer.verify_access_token(&pair.access_token).unwrap(), identity);
        }
    }

    #[test]
    fn refresh_token_carries_user_and_version() {
        let (_clock, issuer) = issuer();
        let pair = issuer.generate_tokens(&alice()).unwrap();
        let claims = issuer.verify_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.token_version, start().timestamp_millis());
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn refresh_tokens_differ_even_on_a_frozen_clock() {
        let (_clock, issuer) = issuer();
        let a = issuer.generate_tokens(&alice()).unwrap();
        let b = issuer.generate_tokens(&alice()).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);

        let va = issuer.verify_refresh_token(&a.refresh_token).unwrap().token_version;
        let vb = issuer.verify_refresh_token(&b.refresh_token).unwrap().token_version;
        assert!(vb > va);
    }

    #[test]
    fn tokens_expire_with_the_clock() {
        let (clock, issuer) = issuer();
        let pair = issuer.generate_tokens(&alice()).unwrap();

        clock.advance(Duration::minutes(15) - Duration::seconds(1));
        assert!(issuer.verify_access_token(&pair.access_token).is_ok());
        assert!(!issuer.is_expired(&pair.access_token));

        clock.advance(Duration::seconds(1));
        assert!(matches!(
            issuer.verify_access_token(&pair.access_token),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(issuer.is_expired(&pair.access_token));

        // Refresh token outlives the access token.
        assert!(issuer.verify_refresh_token(&pair.refresh_token).is_ok());
        clock.advance(Duration::days(7));
        assert!(matches!(
            issuer.verify_refresh_token(&pair.refresh_token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (_clock, issuer_a) = issuer();
        let (_clock, issuer_b) = issuer_with(AuthConfig::with_secret("other-secret"));
        let pair = issuer_a.generate_tokens(&alice()).unwrap();
        assert!(matches!(
            issuer_b.verify_access_token(&pair.access_token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let (_clock, issuer) = issuer();
        let pair = issuer.generate_tokens(&alice()).unwrap();
        assert!(issuer.verify_access_token(&pair.refresh_token).is_err());
        assert!(issuer.verify_refresh_token(&pair.access_token).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let (_clock, issuer) = issuer();
        for token in ["", "garbage", "a.b.c", "invalid.token.here"] {
            assert!(matches!(
                issuer.verify_access_token(token),
                Err(AuthError::InvalidToken(_))
            ));
        }
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let (_clock, issuer) = issuer();
        let pair = issuer.generate_tokens(&alice()).unwrap();
        let admin = issuer
            .generate_tokens(&Identity::new("u1", "a@b.com", Role::Admin))
            .unwrap();

        // Splice the admin payload onto the user's signature.
        let user_parts: Vec<&str> = pair.access_token.split('.').collect();
        let admin_parts: Vec<&str> = admin.access_token.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);
        assert!(issuer.verify_access_token(&forged).is_err());
    }

    #[test]
    fn extract_token_requires_exact_bearer_form() {
        assert_eq!(TokenIssuer::extract_token(Some("Bearer abc.def")).unwrap(), "abc.def");

        for header in [
            None,
            Some(""),
            Some("abc.def"),
            Some("Bearer"),
            Some("Bearer "),
            Some("bearer abc"),
            Some("Basic abc"),
            Some("Bearer abc def"),
            Some("Bearer  abc"),
        ] {
            assert!(
                matches!(TokenIssuer::extract_token(header), Err(AuthError::MissingToken)),
                "expected MissingToken for {:?}",
                header
            );
        }
    }

    #[test]
    fn decode_skips_signature_check() {
        let (_clock, issuer) = issuer();
        let (_clock, other) = issuer_with(AuthConfig::with_secret("other-secret"));
        let pair = other.generate_tokens(&alice()).unwrap();

        assert!(issuer.verify_access_token(&pair.access_token).is_err());
        let claims: AccessClaims = TokenIssuer::decode(&pair.access_token).unwrap();
        assert_eq!(claims.id, "u1");
    }

    #[test]
    fn is_expired_fails_closed() {
        let (_clock, issuer) = issuer();
        assert!(issuer.is_expired("not-a-token"));
        assert!(issuer.is_expired(""));
    }

    #[test]
    fn construction_fails_fast() {
        assert!(matches!(
            TokenIssuer::new(&AuthConfig::default()),
            Err(AuthError::Config(_))
        ));

        let mut config = AuthConfig::with_secret("s");
        config.jwt_expiry = "soon".into();
        assert!(matches!(TokenIssuer::new(&config), Err(AuthError::Config(_))));

        let mut config = AuthConfig::with_secret("s");
        config.refresh_token_expiry = "0".into();
        assert!(matches!(TokenIssuer::new(&config), Err(AuthError::Config(_))));
    }
}
