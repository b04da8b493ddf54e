//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Opens the store and the object storage backend
//! - Starts the HTTP server with graceful shutdown support
//! - Closes the store once the server has stopped

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use course_admin::config::{Config, StorageConfig};
use course_admin::database::{AppState, Store};
use course_admin::maintenance::spawn_orphan_sweep;
use course_admin::route::create_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("course_admin=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let store = Store::open(&config.database_url)
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let uploads = config
        .storage
        .build()
        .context("failed to set up object storage")?;

    let state = AppState {
        store: store.clone(),
        uploads,
        max_upload_bytes: config.max_upload_bytes,
    };

    let sweeper = config
        .orphan_sweep_interval
        .map(|every| spawn_orphan_sweep(store.clone(), every));

    let mut app = create_app(state);
    // The local backend's public URLs point back at this server
    if let StorageConfig::Local { root, .. } = &config.storage {
        app = app.nest_service("/files", ServeDir::new(root));
    }
    let app = app.layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(port = config.port, database = %config.database_url, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The sweeper holds a store clone; wait for it to be dropped
    if let Some(sweeper) = sweeper {
        sweeper.abort();
        if let Err(err) = sweeper.await {
            if !err.is_cancelled() {
                tracing::error!(error = %err, "orphan sweep task failed");
            }
        }
    }
    store.close();
    tracing::info!("store closed, bye");

    Ok(())
}

/// Returns once SIGINT (Ctrl+C) or, on Unix, SIGTERM is received
///
/// Open connections are allowed to complete before the store is closed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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

    tracing::info!("shutdown signal received, stopping server");
}
