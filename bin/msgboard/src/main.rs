//! # msgboard Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use mb_api::{create_router, handlers::AppState};
use mb_config::{AppConfig, LogFormat, LoggingConfig};
use mb_core::{BoardService, ThreadRepo};
use secrecy::ExposeSecret;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// Feature-gated imports: each store plugin is compiled in on request
#[cfg(feature = "db-sqlite")]
use mb_db_sqlite::SqliteThreadRepo;

#[cfg(feature = "store-memory")]
use mb_store_memory::MemoryThreadRepo;

#[cfg(not(any(feature = "db-sqlite", feature = "store-memory")))]
compile_error!("enable at least one store feature: `db-sqlite` or `store-memory`");

/// `RUST_LOG` takes precedence over the configured filter.
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).init(),
    }
}

/// Picks the store named by `database.url`. The url itself is never logged.
#[cfg_attr(not(feature = "db-sqlite"), allow(unused_variables))]
async fn build_repo(url: &str, max_connections: u32) -> anyhow::Result<Arc<dyn ThreadRepo>> {
    #[cfg(feature = "store-memory")]
    {
        if url == "memory" {
            tracing::warn!("using in-memory store; threads are lost on exit");
            return Ok(Arc::new(MemoryThreadRepo::new()));
        }
    }

    #[cfg(feature = "db-sqlite")]
    {
        if url.starts_with("sqlite:") {
            let repo = SqliteThreadRepo::new(url, max_connections)
                .await
                .context("failed to open SQLite store")?;
            tracing::info!("using SQLite store");
            return Ok(Arc::new(repo));
        }
    }

    anyhow::bail!("database.url does not name a store compiled into this binary")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    // 1. Initialize the store
    let repo = build_repo(
        config.database.url.expose_secret(),
        config.database.max_connections,
    )
    .await?;

    // 2. Wrap in AppState (dynamic dispatch over whichever store was picked)
    let state = Arc::new(AppState {
        service: BoardService::new(repo),
    });
    let router = create_router(state, config.server.public_dir.as_deref());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "msgboard listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
