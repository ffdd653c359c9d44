//! Service entry point.
//!
//! Startup order is fail-fast and sequential: configuration (including the
//! fatal encryption-key check) → store → admin seeding → background tasks →
//! listener. Traffic is only accepted once everything else is ready.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkgate::config::{load_config, Secrets};
use linkgate::crypto::password::hash_password;
use linkgate::lifecycle::signals;
use linkgate::maintenance::CleanupTask;
use linkgate::store::Store;
use linkgate::{AppState, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "linkgate", about = "Guarded link-generation service")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "linkgate.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkgate=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "linkgate starting");

    let cli = Cli::parse();

    // Both of these are fatal: a half-configured instance must not serve.
    let config = Arc::new(load_config(&cli.config)?);
    let secrets = Secrets::from_env()?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        window_secs = config.rate_limit.window_secs,
        max_requests = config.rate_limit.max_requests,
        retention_days = config.retention.days,
        "configuration loaded"
    );

    let store = Store::open(&config.database.path)?;
    seed_admin(&store, &config.admin.username, secrets.admin_password.as_deref())?;

    let state = AppState::new(config.clone(), store.clone(), secrets.encryption_key);

    let shutdown = Shutdown::new();

    // Background sweeps run concurrently with request handling, each on its
    // own interval.
    let cleanup = CleanupTask::new(
        store.clone(),
        state.sessions.clone(),
        config.rate_limit.clone(),
    );
    tokio::spawn(cleanup.run(shutdown.subscribe()));
    tokio::spawn(
        state
            .anonymizer
            .clone()
            .run(config.retention.clone(), shutdown.subscribe()),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(state);
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    signals::wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    store.close()?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Create or refresh the admin account. Without `ADMIN_PASSWORD` an existing
/// hash is left alone; a brand-new deployment then has no usable admin login
/// until the variable is provided.
fn seed_admin(
    store: &Store,
    username: &str,
    password: Option<&str>,
) -> Result<(), rusqlite::Error> {
    match password {
        Some(password) => {
            store.upsert_admin(username, &hash_password(password), Utc::now().timestamp())?;
            tracing::info!(%username, "admin account seeded");
        }
        None => {
            if store.admin_by_username(username)?.is_none() {
                tracing::warn!(
                    %username,
                    "ADMIN_PASSWORD not set and no admin account exists; admin login disabled"
                );
            }
        }
    }
    Ok(())
}
