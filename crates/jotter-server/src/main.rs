//! # jotter-server
//!
//! REST backend for the Jotter notes application.
//!
//! This binary provides:
//! - **CRUD API** (axum) over the `notes` collection, with owner
//!   enrichment from `users` on listing
//! - **Case-insensitive title uniqueness** backed by a collated unique
//!   index in the document store
//! - **Per-IP login rate limiting** (sliding 60-second window)

mod api;
mod config;
mod error;
mod rate_limit;

use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jotter_store::Store;

use crate::api::AppState;
use crate::config::Config;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,jotter_server=debug")),
        )
        .init();

    info!("Starting Jotter notes server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = Config::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Connect the document store
    // -----------------------------------------------------------------------
    // The handle is built eagerly but connects lazily.  An unreachable
    // database at startup is logged and otherwise ignored: the server
    // still comes up and each request fails with its own store error
    // until the database returns.
    let store = Store::connect(&config.connection_uri(), &config.database_name).await?;

    match store.ping().await {
        Ok(()) => {
            info!(database = %config.database_name, "Connected to document store");
            if let Err(e) = store.ensure_indexes().await {
                error!(error = %e, "Failed to ensure unique title index");
            }
        }
        Err(e) => {
            error!(error = %e, "Document store unreachable at startup, continuing anyway");
        }
    }

    // -----------------------------------------------------------------------
    // 4. Rate limiter + background cleanup
    // -----------------------------------------------------------------------
    let login_limiter = RateLimiter::new(
        config.login_max_attempts,
        Duration::from_secs(config.login_window_secs),
    );

    // Periodic eviction of idle per-IP windows (every 5 minutes, evict
    // entries idle longer than 10 minutes).
    let limiter = login_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.purge_stale(Duration::from_secs(600)).await;
        }
    });

    let state = AppState {
        store,
        login_limiter,
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
