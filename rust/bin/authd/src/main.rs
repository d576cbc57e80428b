//! `crewkit-authd`: standalone session and token server.
//!
//! Usage:
//!   crewkit-authd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/crewkit/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod login;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};

use crewkit_auth::api::AuthState;
use crewkit_auth::{KvSessionStore, SessionManager, TokenIssuer};
use crewkit_kv::{KVStore, MemoryStore, RedbStore};

use config::ServerConfig;
use login::{Directory, LoginState};

/// Crewkit auth server.
#[derive(Parser, Debug)]
#[command(name = "crewkit-authd", about = "Crewkit auth server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    bootstrap::verify_config(&server_config)?;

    let kv: Arc<dyn KVStore> = if server_config.storage.in_memory {
        warn!("Using in-memory session store; sessions are lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        std::fs::create_dir_all(&server_config.storage.data_dir)?;
        let db_path = server_config.db_path();
        info!("Opening session store at {}", db_path.display());
        Arc::new(
            RedbStore::open(&db_path)
                .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
        )
    };

    let auth_config = server_config.auth_config()?;
    let issuer = Arc::new(TokenIssuer::new(&auth_config)?);
    let store = Arc::new(KvSessionStore::new(Arc::clone(&kv)));
    let sessions = Arc::new(SessionManager::new(issuer, store, &auth_config));

    let directory = Arc::new(Directory::from_users(&server_config.users)?);
    info!("Loaded {} user(s)", directory.len());

    spawn_purge_task(
        Arc::clone(&kv),
        Duration::from_secs(server_config.storage.purge_interval_secs.max(1)),
    );

    let app = routes::build_router(
        AuthState::new(Arc::clone(&sessions)),
        LoginState { sessions, directory },
    );

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("crewkit-authd listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop expired entries so the store does not grow without bound.
fn spawn_purge_task(kv: Arc<dyn KVStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let kv = Arc::clone(&kv);
            match tokio::task::spawn_blocking(move || kv.purge_expired()).await {
                Ok(Ok(0)) => {}
                Ok(Ok(n)) => debug!(removed = n, "purged expired entries"),
                Ok(Err(e)) => warn!(error = %e, "purge failed"),
                Err(e) => warn!(error = %e, "purge task panicked"),
            }
        }
    });
}
