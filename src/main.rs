//! Ephemeral messages and stories over HTTP
//!
//! (c) Softlandia 2025

use ephemeral_content_api::api;
use ephemeral_content_api::config::CONFIG;
use ephemeral_content_api::core::expiry;
use ephemeral_content_api::core::traits::{Clock, SweepService};
use ephemeral_content_api::infrastructure::database::DatabaseConnection;
use ephemeral_content_api::service_collection;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use di::ServiceProvider;
use di_axum::RouterServiceProviderExtensions;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    let provider = service_collection()
        .build_provider()
        .map_err(|e| anyhow::anyhow!("invalid service registrations: {e:?}"))?;

    runtime.block_on(async {
        provider
            .get_required::<DatabaseConnection>()
            .migrate()
            .await
            .context("failed to migrate the database")?;

        // background task for expired content
        let sweeper_handle = tokio::spawn(expiry::background_task(
            provider.get_required::<dyn SweepService>(),
            provider.get_required::<dyn Clock>(),
            CONFIG.sweep_interval,
        ));

        let result = web_server_task(provider).await;
        sweeper_handle.abort();
        result
    })
}

async fn web_server_task(provider: ServiceProvider) -> anyhow::Result<()> {
    let origins: Vec<HeaderValue> = CONFIG
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    let app = api::router()
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_origin(origins),
        )
        .with_provider(provider);

    let listener = TcpListener::bind(CONFIG.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", CONFIG.bind_addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    info!("Shutting down...");

    Ok(())
}
