// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley serve` command implementation.
//!
//! Opens SQLite storage, builds the HTTP transport and orchestrator, and
//! serves the gateway until SIGINT/SIGTERM. A batch still running at that
//! point is aborted and committed before the process exits.

use tracing::info;
use volley_config::VolleyConfig;
use volley_core::{StorageAdapter, VolleyError};
use volley_gateway::{GatewayState, ServerConfig, start_server};

use crate::{context, shutdown};

pub async fn run_serve(
    config: &VolleyConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), VolleyError> {
    info!("starting volley serve");

    let store = context::open_store(config).await?;
    let transport = context::transport(config)?;
    info!(endpoint = transport.url(), "completion transport ready");
    let orchestrator = context::orchestrator(config, transport, store.clone());

    let state = GatewayState::new(store.clone(), orchestrator)
        .with_defaults(config.generation.to_generation_config())
        .with_configured_credential(config.endpoint.api_key.clone());
    let server = ServerConfig {
        host: host.unwrap_or_else(|| config.gateway.host.clone()),
        port: port.unwrap_or(config.gateway.port),
    };

    let signals = shutdown::install_signal_handler();
    start_server(&server, state, signals).await?;

    store.close().await?;
    info!("volley serve stopped");
    Ok(())
}
