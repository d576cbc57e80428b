//! Startup checks. The server refuses to start on a configuration that
//! could never authenticate anyone.

use std::collections::HashSet;

use crewkit_auth::permission::is_valid_role;

use crate::config::ServerConfig;

pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    config
        .auth_config()
        .and_then(|auth| Ok(auth.validate()?))
        .map_err(|e| anyhow::anyhow!("invalid [jwt] section: {}", e))?;

    if !config.storage.in_memory && config.storage.data_dir.is_empty() {
        anyhow::bail!("storage.data_dir is empty and storage.in_memory is not set.");
    }
    if config.users.is_empty() {
        anyhow::bail!("No [[users]] configured; nobody could log in.");
    }

    let mut ids = HashSet::new();
    let mut emails = HashSet::new();
    for user in &config.users {
        if !is_valid_role(&user.role) {
            anyhow::bail!("user {} has unknown role {:?}", user.id, user.role);
        }
        if user.password_hash.is_empty() {
            anyhow::bail!("user {} has an empty password_hash", user.id);
        }
        if !ids.insert(user.id.as_str()) {
            anyhow::bail!("duplicate user id {}", user.id);
        }
        if !emails.insert(user.email.as_str()) {
            anyhow::bail!("duplicate user email {}", user.email);
        }
    }
    Ok(())
}
