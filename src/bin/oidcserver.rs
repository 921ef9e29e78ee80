//! OpenID Connect identity provider server binary.
//!
//! Loads configuration from the environment, builds the authorization
//! server and serves it over HTTP with graceful shutdown.

use anyhow::{Context, Result};
use oidcserver::{
    config::{Config, LOCAL_CONNECTOR},
    errors::ConfigError,
    http::{AppEngine, AppState, bind_listener, build_router},
    oauth::{
        Connector, KeyDataSigner, MockConnector, OidcServer, StaticClientSource,
        connectors::mock::MOCK_CONNECTOR,
    },
    storage::{create_storage_backend, parse_storage_backend},
    templates::build_env,
};
use std::{env, sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "oidcserver=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = oidcserver::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting oidcserver");

    let config = Config::new()?;
    let server_config = config.server_config()?;

    let signing_keys: &Vec<_> = config.signing_keys.as_ref();
    let signer = Arc::new(KeyDataSigner::new(signing_keys)?);

    let client_source = match &config.clients_file {
        Some(path) => StaticClientSource::from_file(path)
            .await
            .map_err(|e| ConfigError::ClientsLoadFailed(e.to_string()))?,
        None => {
            tracing::warn!("CLIENTS_FILE is not set, no clients are registered");
            StaticClientSource::new(Vec::new())?
        }
    };
    tracing::info!(clients = client_source.len(), "client directory loaded");

    let mut connectors: Vec<Arc<dyn Connector>> = Vec::new();
    let enabled_connectors: &Vec<String> = config.connectors.as_ref();
    for connector_id in enabled_connectors {
        match connector_id.as_str() {
            MOCK_CONNECTOR => connectors.push(Arc::new(MockConnector::with_default_identity())),
            LOCAL_CONNECTOR => {
                return Err(ConfigError::UnknownConnector(format!(
                    "{} (no password database is configured)",
                    connector_id
                ))
                .into());
            }
            other => return Err(ConfigError::UnknownConnector(other.to_string()).into()),
        }
    }
    if connectors.is_empty() {
        tracing::warn!("no connectors enabled, users will not be able to log in");
    }

    let storage_backend =
        parse_storage_backend(&config.storage_backend, config.database_url.as_deref())
            .map_err(|e| ConfigError::UnsupportedStorageBackend(e.to_string()))?;
    let storage = create_storage_backend(storage_backend).await?;

    let server = OidcServer::new(
        server_config,
        storage,
        signer,
        Arc::new(client_source),
        connectors,
    )
    .await?;

    let template_env = AppEngine::from(build_env(&config.http_templates_path));

    let app_context = AppState {
        server: server.clone(),
        template_env,
    };

    let allowed_origins: &Vec<String> = config.allowed_origins.as_ref();
    let app = build_router(app_context, allowed_origins);

    let http_port = *config.http_port.as_ref();
    let bind_address = format!("0.0.0.0:{http_port}");
    let listener = bind_listener(&bind_address).await?;
    tracing::info!("Starting server on {bind_address}");

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

    // Periodically drop expired requests and codes
    {
        let server = server.clone();
        let inner_token = token.clone();
        tracker.spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    () = inner_token.cancelled() => break,
                    _ = interval.tick() => {
                        match server.cleanup_expired().await {
                            Ok((requests, codes)) if requests + codes > 0 => {
                                tracing::debug!(requests, codes, "removed expired records");
                            }
                            Ok(_) => {}
                            Err(err) => tracing::warn!(error = %err, "cleanup failed"),
                        }
                    }
                }
            }
        });
    }

    // Start HTTP server
    let server_task = {
        let inner_token = token.clone();
        tracker.spawn(async move {
            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        () = shutdown_token.cancelled() => { }
                    }
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = &result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
            result
        })
    };

    tracker.close();
    tracker.wait().await;

    server_task.await?.context("HTTP server failed")?;

    Ok(())
}
