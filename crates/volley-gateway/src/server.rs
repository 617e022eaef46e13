// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use volley_bench::BatchOrchestrator;
use volley_core::{GenerationConfig, StorageAdapter, VolleyError};

use crate::{handlers, sse};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn StorageAdapter>,
    pub orchestrator: BatchOrchestrator,
    /// Config used when a run request carries none.
    pub defaults: GenerationConfig,
    /// Credential from the config file, consulted after the stored key.
    pub configured_credential: Option<String>,
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(store: Arc<dyn StorageAdapter>, orchestrator: BatchOrchestrator) -> Self {
        Self {
            store,
            orchestrator,
            defaults: GenerationConfig::default(),
            configured_credential: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_defaults(mut self, defaults: GenerationConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_configured_credential(mut self, credential: Option<String>) -> Self {
        self.configured_credential = credential.filter(|c| !c.is_empty());
        self
    }
}

/// Gateway bind address (mirrors `[gateway]` in the config file).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builds the full route table.
pub fn router(state: GatewayState) -> Router {
    let prompt_routes = Router::new()
        .route(
            "/api/prompts/{kind}",
            get(handlers::list_prompts).post(handlers::save_prompt),
        )
        .route("/api/prompts/{kind}/{id}", delete(handlers::delete_prompt))
        .route("/api/prompts/{kind}/{id}/title", patch(handlers::rename_prompt))
        .route(
            "/api/prompts/{kind}/{id}/favorite",
            patch(handlers::toggle_prompt_favorite),
        );

    let history_routes = Router::new()
        .route(
            "/api/history",
            get(handlers::list_history).post(handlers::save_history),
        )
        .route("/api/history/{id}", delete(handlers::delete_history))
        .route(
            "/api/history/{id}/favorite",
            patch(handlers::toggle_history_favorite),
        );

    let run_routes = Router::new()
        .route("/api/runs", post(handlers::start_run))
        .route("/api/runs/abort", post(handlers::abort_run))
        .route("/api/runs/current", get(handlers::current_run))
        .route("/api/runs/current/events", get(sse::stream_current_run));

    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/health", get(handlers::get_health))
        .route(
            "/api/settings/api-key",
            get(handlers::get_api_key).post(handlers::set_api_key),
        )
        .merge(prompt_routes)
        .merge(history_routes)
        .merge(run_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves on an already-bound listener until `shutdown` is cancelled.
///
/// On shutdown any running batch is aborted and finalized before open
/// connections are drained, so event streams end cleanly.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), VolleyError> {
    let orchestrator = state.orchestrator.clone();
    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("gateway shutting down");
            orchestrator.shutdown().await;
        })
        .await
        .map_err(|e| VolleyError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Binds the configured address and serves until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), VolleyError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| VolleyError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");
    serve(listener, state, shutdown).await
}
