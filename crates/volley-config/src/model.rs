// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use volley_core::{GenerationConfig, ThinkingMode};

/// Default chat-completion endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://ark.cn-beijing.volces.com/api/v3/chat/completions";

/// Top-level Volley configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VolleyConfig {
    #[serde(default)]
    pub app: AppConfig,

    /// Completion endpoint and credential lookup.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Default generation parameters for new batches.
    #[serde(default)]
    pub generation: GenerationDefaults,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Completion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Full URL of the chat-completions route.
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// API key. Prefer the settings store or an environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variables consulted, in order, when no key is configured.
    #[serde(default = "default_env_fallbacks")]
    pub env_fallbacks: Vec<String>,

    /// TCP connect timeout. The response body itself is never timed out.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            api_key: None,
            env_fallbacks: default_env_fallbacks(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

fn default_env_fallbacks() -> Vec<String> {
    vec!["ARK_API_KEY".to_string(), "API_KEY".to_string()]
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Default generation parameters, mirrored onto [`GenerationConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationDefaults {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default)]
    pub frequency_penalty: f64,

    #[serde(default)]
    pub presence_penalty: f64,

    /// `enabled` or `disabled`.
    #[serde(default = "default_thinking")]
    pub thinking: ThinkingMode,

    /// Number of parallel slots per batch.
    #[serde(default = "default_output_count")]
    pub output_count: usize,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        GenerationConfig::default().into()
    }
}

impl From<GenerationConfig> for GenerationDefaults {
    fn from(config: GenerationConfig) -> Self {
        Self {
            model: config.model,
            temperature: config.temperature,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            thinking: config.thinking,
            output_count: config.output_count,
        }
    }
}

impl GenerationDefaults {
    pub fn to_generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            thinking: self.thinking,
            output_count: self.output_count,
        }
    }
}

fn default_model() -> String {
    GenerationConfig::default().model
}

fn default_temperature() -> f64 {
    GenerationConfig::default().temperature
}

fn default_thinking() -> ThinkingMode {
    ThinkingMode::Enabled
}

fn default_output_count() -> usize {
    GenerationConfig::default().output_count
}

/// Batch scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Delay between successive slot launches, in milliseconds. Slot `i`
    /// waits `i * stagger_ms` before issuing its request.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger_ms(),
        }
    }
}

fn default_stagger_ms() -> u64 {
    50
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead logging.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("volley").join("volley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("volley.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}
