// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{Router, routing::get};
use mflow_config::model::WebhookConfig;
use mflow_core::FlowError;
use mflow_sync::Inbox;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::auth::WebhookAuth;
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub inbox: Arc<Inbox>,
    pub auth: WebhookAuth,
    /// Set when the inbox failed to load at startup.
    pub init_error: Option<String>,
}

impl GatewayState {
    pub fn new(inbox: Arc<Inbox>, auth: WebhookAuth) -> Self {
        Self {
            inbox,
            auth,
            init_error: None,
        }
    }

    pub fn with_init_error(mut self, err: impl Into<String>) -> Self {
        self.init_error = Some(err.into());
        self
    }
}

/// Bind address and optional static directory.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            static_dir: config.static_dir.as_ref().map(PathBuf::from),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl WebhookAuth {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            verify_token: config.verify_token.clone(),
            app_secret: config.app_secret.clone(),
        }
    }
}

/// Build the router.
///
/// With a static directory, unknown paths fall back to its files and finally
/// to `index.html`.
pub fn router(state: GatewayState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .with_state(state);

    let app = match static_dir {
        Some(dir) => app.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), FlowError> {
    let app = router(state, config.static_dir.as_deref());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FlowError::Config(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| FlowError::Internal(format!("server error: {e}")))?;

    tracing::info!("server stopped");
    Ok(())
}
