// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/volley/volley.toml` < `~/.config/volley/volley.toml`
//! < `./volley.toml`, with `VOLLEY_` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VolleyConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/volley/volley.toml";
pub(crate) const LOCAL_CONFIG: &str = "volley.toml";

/// Sections recognised by the env provider, in the order they are matched.
const SECTIONS: &[&str] = &["app", "endpoint", "generation", "batch", "storage", "gateway"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("volley").join("volley.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<VolleyConfig, figment::Error> {
    let figment = build_figment();
    for meta in figment.metadata() {
        tracing::debug!(source = %meta.name, "config provider");
    }
    figment.extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<VolleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VolleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VolleyConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading config file");
    Figment::new()
        .merge(Serialized::defaults(VolleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VolleyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `VOLLEY_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `VOLLEY_BATCH_STAGGER_MS` must become `batch.stagger_ms`.
fn env_provider() -> Env {
    Env::prefixed("VOLLEY_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
