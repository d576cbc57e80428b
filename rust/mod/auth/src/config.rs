//! Auth configuration and expiry-string parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Configuration for token issuance and session storage.
///
/// `jwt_secret` has no usable default: an empty secret is rejected when the
/// [`TokenIssuer`](crate::token::TokenIssuer) is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret for both token kinds.
    #[serde(default)]
    pub jwt_secret: String,

    /// Access token lifetime, e.g. `"15m"` or `"24h"`.
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry: String,

    /// Refresh token lifetime, e.g. `"7d"`.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: String,

    /// Store TTL of `session:` records, in seconds (default: 24h).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Store TTL of `refresh:` records, in seconds (default: 7 days).
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
}

fn default_jwt_expiry() -> String {
    "24h".to_string()
}

fn default_refresh_token_expiry() -> String {
    "7d".to_string()
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiry: default_jwt_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
            session_ttl_secs: default_session_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
        }
    }
}

impl AuthConfig {
    /// Config with the given secret and default lifetimes.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            ..Default::default()
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_lifetime_secs(&self) -> Result<i64, AuthError> {
        parse_expiry(&self.jwt_expiry)
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_lifetime_secs(&self) -> Result<i64, AuthError> {
        parse_expiry(&self.refresh_token_expiry)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// Check every field. Called by the token issuer before it accepts the config.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(AuthError::Config("jwt_secret must not be empty".into()));
        }
        self.access_lifetime_secs()?;
        let refresh_lifetime = self.refresh_lifetime_secs()?;
        if self.session_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err(AuthError::Config("store TTLs must be positive".into()));
        }
        // A refresh record must not expire before the token it backs.
        if self.refresh_ttl_secs < refresh_lifetime.unsigned_abs() {
            return Err(AuthError::Config(format!(
                "refresh_ttl_secs ({}) is shorter than refresh_token_expiry ({:?})",
                self.refresh_ttl_secs, self.refresh_token_expiry
            )));
        }
        Ok(())
    }
}

/// Parse an expiry string into seconds.
///
/// Accepts a bare number of seconds (`"3600"`) or a number followed by a
/// unit: `s`, `m`, `h`, `d`, `w`, `y` (`"15m"`, `"7d"`). Whitespace between
/// number and unit is allowed. The result must be positive.
pub fn parse_expiry(raw: &str) -> Result<i64, AuthError> {
    let s = raw.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let invalid = || AuthError::Config(format!("invalid expiry: {:?}", raw));

    let n: i64 = digits.parse().map_err(|_| invalid())?;
    let multiplier: i64 = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        "y" => 365 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let secs = n.checked_mul(multiplier).ok_or_else(invalid)?;
    if secs <= 0 {
        return Err(invalid());
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!(parse_expiry("3600").unwrap(), 3600);
        assert_eq!(parse_expiry("45s").unwrap(), 45);
        assert_eq!(parse_expiry("15m").unwrap(), 900);
        assert_eq!(parse_expiry("24h").unwrap(), 86_400);
        assert_eq!(parse_expiry("7d").unwrap(), 604_800);
        assert_eq!(parse_expiry("2w").unwrap(), 1_209_600);
        assert_eq!(parse_expiry(" 1 y ").unwrap(), 31_536_000);
    }

    #[test]
    fn parse_rejects_garbage() {
        for raw in ["", "h", "10x", "-5m", "0", "0d", "1.5h", "99999999999999999999y"] {
            assert!(
                matches!(parse_expiry(raw), Err(AuthError::Config(_))),
                "expected rejection for {:?}",
                raw
            );
        }
    }

    #[test]
    fn defaults_match_reference_lifetimes() {
        let config = AuthConfig::with_secret("s3cret");
        assert_eq!(config.access_lifetime_secs().unwrap(), 86_400);
        assert_eq!(config.refresh_lifetime_secs().unwrap(), 604_800);
        assert_eq!(config.session_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.refresh_ttl(), Duration::from_secs(604_800));
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_secret() {
        assert!(matches!(
            AuthConfig::default().validate(),
            Err(AuthError::Config(_))
        ));
        assert!(AuthConfig::with_secret("   ").validate().is_err());
    }

    #[test]
    fn validate_rejects_refresh_ttl_shorter_than_token() {
        let mut config = AuthConfig::with_secret("s3cret");
        config.refresh_token_expiry = "30d".into();
        assert!(matches!(config.validate(), Err(AuthError::Config(_))));

        config.refresh_ttl_secs = 30 * 24 * 60 * 60;
        config.validate().unwrap();
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"jwt_secret":"abc","jwt_expiry":"15m"}"#).unwrap();
        assert_eq!(config.jwt_expiry, "15m");
        assert_eq!(config.refresh_token_expiry, "7d");
        assert_eq!(config.session_ttl_secs, 86_400);
    }
}
