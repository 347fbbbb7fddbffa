//! OAuth 2.0 authorization server binary.
//!
//! Loads configuration, connects storage, starts the expiry reaper and the HTTP server,
//! and shuts both down on Ctrl+C or SIGTERM.

use anyhow::Result;
use oauth2_server::{
    config::Config,
    http::{AppEngine, AppState, build_router},
    oauth::ExpiryReaper,
    storage::{create_storage_backend, parse_storage_backend},
    templates::build_env,
};
use std::env;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "oauth2_server=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = oauth2_server::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting OAuth2 server");

    let config = Config::new()?;

    let template_env = AppEngine::from(build_env()?);

    let storage_backend =
        parse_storage_backend(&config.storage_backend, config.database_url.as_deref())?;
    tracing::info!(backend = %config.storage_backend, "Connecting storage");
    let oauth_storage =
        create_storage_backend(storage_backend, *config.database_max_connections.as_ref()).await?;

    let http_port = *config.http_port.as_ref();
    let reaper = ExpiryReaper::new(
        oauth_storage.clone(),
        *config.cleanup_interval.as_ref(),
        *config.cleanup_timeout.as_ref(),
    );

    let app = build_router(AppState::new(config, oauth_storage, template_env));

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::error!("failed to install signal handler: {}", err);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    reaper.spawn(&tracker, token.clone());

    // Start HTTP server
    {
        let inner_token = token.clone();
        let bind_address = format!("0.0.0.0:{http_port}");
        let listener = TcpListener::bind(&bind_address).await?;
        tracing::info!("Starting server on {bind_address}");

        tracker.spawn(async move {
            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_token.cancelled().await;
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}
