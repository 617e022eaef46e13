// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley verify` command implementation.

use clap::Args;
use secrecy::ExposeSecret;
use volley_config::VolleyConfig;
use volley_core::{StorageAdapter, VolleyError};

use crate::context;
use crate::output::Style;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Key to check; defaults to the stored, configured, then environment key.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model to probe; defaults to `[generation] model`.
    #[arg(long)]
    pub model: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Returns whether the endpoint accepted the credential.
pub async fn run_verify(config: &VolleyConfig, args: VerifyArgs, style: Style) -> Result<bool, VolleyError> {
    let store = context::open_store(config).await?;
    let transport = context::transport(config)?;

    let credential = match context::credential(store.as_ref(), config, args.api_key).await {
        Some(key) => Some(key),
        None => transport
            .resolve_credential(None)
            .ok()
            .map(|key| key.expose_secret().to_string()),
    };
    let model = args.model.unwrap_or_else(|| config.generation.model.clone());
    let verification = transport.verify_connection(credential.as_deref(), &model).await;
    store.close().await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&verification).unwrap_or_else(|_| "{}".to_string())
        );
    } else if verification.success {
        println!("{} {} ({model})", style.success("✓"), verification.message);
    } else {
        println!("{} {}", style.failure("✗"), style.failure(&verification.message));
        println!("  {}", style.muted(transport.url()));
    }
    Ok(verification.success)
}
