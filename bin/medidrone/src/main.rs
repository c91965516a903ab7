//! # MediDrone Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use md_api::AppState;
use md_config::{LogFormat, LogSettings, Settings};
use md_core::FleetService;
use secrecy::ExposeSecret;
use tower_http::services::ServeDir;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(feature = "db-sqlite")]
use md_db_sqlite::SqliteFleetRepo;

#[cfg(feature = "storage-local")]
use md_storage_local::LocalMediaStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);
    debug!(server = ?settings.server, media = ?settings.media, "configuration loaded");

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteFleetRepo::new(settings.database.url.expose_secret()).await?;

    // 2. Initialize Storage Implementation
    #[cfg(feature = "storage-local")]
    let media = LocalMediaStore::new(settings.media.root.clone(), settings.media.url_prefix.clone());

    let state = AppState {
        fleet: Arc::new(FleetService::new(Arc::new(repo))),
        media: Arc::new(media),
    };

    let app = md_api::router(state)
        .nest_service(&settings.media.url_prefix, ServeDir::new(&settings.media.root));

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "medidrone listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("medidrone stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
