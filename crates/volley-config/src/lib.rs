// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Volley prompt workbench.
//!
//! Settings live in `volley.toml`. Unknown keys are rejected, files are looked
//! up in the working directory then the XDG config dir, and `VOLLEY_*`
//! variables override both. Errors render through miette with typo hints.
//!
//! # Usage
//!
//! ```no_run
//! use volley_config::load_and_validate;
//!
//! let config = load_and_validate().map_err(|errs| errs.len())?;
//! println!("Endpoint: {}", config.endpoint.url);
//! # Ok::<(), usize>(())
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::VolleyConfig;

/// Loads `volley.toml` from the usual places, applies `VOLLEY_*` overrides and
/// validates the result.
///
/// On a parse failure the TOML sources are read a second time so diagnostics
/// can point at the offending key.
pub fn load_and_validate() -> Result<VolleyConfig, Vec<ConfigError>> {
    checked(loader::load_config(), discovered_sources)
}

/// Same as [`load_and_validate`] but for one explicit file.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<VolleyConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Parses and validates an in-memory TOML document.
pub fn load_and_validate_str(toml_content: &str) -> Result<VolleyConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_owned(), toml_content.to_owned())]
    })
}

fn checked(
    loaded: Result<VolleyConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<VolleyConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::into_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn read_source(path: &std::path::Path) -> Option<(String, String)> {
    let text = std::fs::read_to_string(path).ok()?;
    Some((path.display().to_string(), text))
}

/// Every config file that exists, in precedence order (local first).
fn discovered_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|dir| dir.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());

    [
        Some(local),
        loader::user_config_path(),
        Some(loader::SYSTEM_CONFIG.into()),
    ]
    .into_iter()
    .flatten()
    .filter_map(|path| read_source(&path))
    .collect()
}
