// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter wiring shared by the commands.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use volley_bench::{BatchOrchestrator, OrchestratorSettings};
use volley_config::VolleyConfig;
use volley_core::{SettingsStore, VolleyError};
use volley_openai::OpenAiTransport;
use volley_storage::SqliteStorage;

pub async fn open_store(config: &VolleyConfig) -> Result<Arc<SqliteStorage>, VolleyError> {
    Ok(Arc::new(SqliteStorage::open(config.storage.clone()).await?))
}

pub fn transport(config: &VolleyConfig) -> Result<Arc<OpenAiTransport>, VolleyError> {
    Ok(Arc::new(OpenAiTransport::from_config(&config.endpoint)?))
}

pub fn orchestrator(
    config: &VolleyConfig,
    transport: Arc<OpenAiTransport>,
    store: Arc<SqliteStorage>,
) -> BatchOrchestrator {
    let settings = OrchestratorSettings {
        stagger: Duration::from_millis(config.batch.stagger_ms),
    };
    BatchOrchestrator::new(transport, store, settings)
}

/// Explicit key, then the stored key, then `[endpoint] api_key`. `None`
/// leaves the transport to its environment fallbacks.
pub async fn credential(
    settings: &dyn SettingsStore,
    config: &VolleyConfig,
    explicit: Option<String>,
) -> Option<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Some(key);
    }
    match settings.get_api_key().await {
        Ok(Some(key)) => return Some(key),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to read stored API key"),
    }
    config.endpoint.api_key.clone().filter(|k| !k.is_empty())
}
