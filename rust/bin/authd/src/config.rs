//! Server configuration, read from a TOML file.
//!
//! ```toml
//! [jwt]
//! secret = "change-me"
//! expiry = "15m"
//! refresh_expiry = "7d"
//! session_ttl = "24h"      # optional, store TTL of session records
//! refresh_ttl = "7d"       # optional, defaults to refresh_expiry
//!
//! [storage]
//! data_dir = "/var/lib/crewkit"
//! purge_interval_secs = 300
//!
//! [[users]]
//! id = "u1"
//! email = "admin@example.com"
//! role = "admin"
//! password_hash = "$argon2id$..."
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crewkit_auth::config::parse_expiry;
use crewkit_auth::AuthConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub jwt: JwtConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_expiry")]
    pub expiry: String,

    #[serde(default = "default_refresh_expiry")]
    pub refresh_expiry: String,

    /// Store TTL of session records. Defaults to 24h.
    #[serde(default)]
    pub session_ttl: Option<String>,

    /// Store TTL of refresh records. Defaults to `refresh_expiry`.
    #[serde(default)]
    pub refresh_ttl: Option<String>,
}

fn default_expiry() -> String {
    "24h".to_string()
}

fn default_refresh_expiry() -> String {
    "7d".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `sessions.redb`. Ignored when `in_memory` is set.
    #[serde(default)]
    pub data_dir: String,

    /// Keep sessions in process memory only.
    #[serde(default)]
    pub in_memory: bool,

    /// Seconds between sweeps of expired store entries.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

fn default_purge_interval() -> u64 {
    300
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            in_memory: false,
            purge_interval_secs: default_purge_interval(),
        }
    }
}

/// A user allowed to log in.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub email: String,
    pub role: String,
    /// argon2 PHC hash.
    pub password_hash: String,
}

impl ServerConfig {
    /// Resolve a config argument: a bare name maps to `/etc/crewkit/<name>.toml`,
    /// anything with `/` or `.` is used as a path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/crewkit/{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn auth_config(&self) -> anyhow::Result<AuthConfig> {
        let mut config = AuthConfig {
            jwt_secret: self.jwt.secret.clone(),
            jwt_expiry: self.jwt.expiry.clone(),
            refresh_token_expiry: self.jwt.refresh_expiry.clone(),
            ..AuthConfig::default()
        };
        if let Some(ttl) = &self.jwt.session_ttl {
            config.session_ttl_secs = parse_expiry(ttl)?.unsigned_abs();
        }
        let refresh_ttl = self.jwt.refresh_ttl.as_deref().unwrap_or(&self.jwt.refresh_expiry);
        config.refresh_ttl_secs = parse_expiry(refresh_ttl)?.unsigned_abs();
        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join("sessions.redb")
    }
}
