//! HTTP request/response boundary.

pub mod api;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::steps::Installer;
use api::AppState;

/// Configuration for the installer server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the full application router. `dev_mode` adds permissive CORS so a
/// front-end served from another origin can drive the steps.
pub fn build_router(config: ServerConfig, installer: Arc<Installer>) -> Router {
    let state = Arc::new(AppState { installer });
    let app = api::api_router().with_state(state);
    if config.dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind and serve until Ctrl+C. `on_ready` receives the bound URL.
pub async fn start_server(
    config: ServerConfig,
    installer: Arc<Installer>,
    on_ready: impl FnOnce(&str),
) -> Result<()> {
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    let url = format!("http://{}", local_addr);
    tracing::info!(%url, dev_mode = config.dev_mode, "installer server listening");
    on_ready(&url);

    axum::serve(listener, build_router(config, installer))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
