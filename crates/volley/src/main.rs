// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volley - a prompt-testing workbench.
//!
//! This is the binary entry point: batch runs in the terminal, the HTTP
//! gateway, and management of the local prompt library and history.

mod context;
mod history;
mod key;
mod output;
mod prompts;
mod run;
mod serve;
mod shutdown;
mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use volley_config::VolleyConfig;
use volley_core::VolleyError;

use crate::output::Style;

/// Volley - send one prompt N times in parallel and compare the answers.
#[derive(Parser, Debug)]
#[command(name = "volley", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colors and live progress.
    #[arg(long, global = true)]
    plain: bool,

    /// Log at the configured level instead of warnings only.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a batch and stream every slot to the terminal.
    Run(run::RunArgs),
    /// Check that the endpoint accepts the credential.
    Verify(verify::VerifyArgs),
    /// Start the HTTP gateway.
    Serve {
        /// Override `[gateway] host`.
        #[arg(long)]
        host: Option<String>,
        /// Override `[gateway] port`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage the saved prompt library.
    Prompts {
        #[command(subcommand)]
        action: prompts::PromptsCommand,
    },
    /// Browse and curate past runs.
    History {
        #[command(subcommand)]
        action: history::HistoryCommand,
    },
    /// Manage the stored API key.
    Key {
        #[command(subcommand)]
        action: key::KeyCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => volley_config::load_and_validate_path(path),
        None => volley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            volley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let log_level = if cli.verbose || matches!(cli.command, Commands::Serve { .. }) {
        config.app.log_level.clone()
    } else {
        "warn".to_string()
    };
    init_tracing(&log_level);

    let style = Style::detect(cli.plain);
    match dispatch(cli.command, &config, style).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {e}", style.failure("error:"));
            std::process::exit(1);
        }
    }
}

/// Runs one command. `Ok(false)` means it completed but reported failure.
async fn dispatch(command: Commands, config: &VolleyConfig, style: Style) -> Result<bool, VolleyError> {
    match command {
        Commands::Run(args) => run::run_batch(config, args, style).await.map(|()| true),
        Commands::Verify(args) => verify::run_verify(config, args, style).await,
        Commands::Serve { host, port } => serve::run_serve(config, host, port).await.map(|()| true),
        Commands::Prompts { action } => {
            let store = context::open_store(config).await?;
            prompts::run_prompts(store.as_ref(), action, style).await.map(|()| true)
        }
        Commands::History { action } => {
            let store = context::open_store(config).await?;
            history::run_history(store.as_ref(), action, style).await.map(|()| true)
        }
        Commands::Key { action } => {
            let store = context::open_store(config).await?;
            key::run_key(store.as_ref(), action, style).await.map(|()| true)
        }
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("volley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "volley", "run", "-u", "hello", "-n", "3", "--temperature", "0.2", "--thinking", "disabled",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.user.as_deref(), Some("hello"));
                assert_eq!(args.count, Some(3));
                assert_eq!(args.temperature, Some(0.2));
                assert_eq!(args.thinking, Some(volley_core::ThinkingMode::Disabled));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_prompt_kind() {
        let cli = Cli::try_parse_from(["volley", "prompts", "list", "user"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Prompts {
                action: prompts::PromptsCommand::List { kind: volley_core::PromptKind::User }
            }
        ));
        assert!(Cli::try_parse_from(["volley", "prompts", "list", "assistant"]).is_err());
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from(["volley", "history", "list", "--plain"]).unwrap();
        assert!(cli.plain);
    }

    #[test]
    #[serial_test::serial]
    fn binary_loads_config_defaults() {
        let config = volley_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.batch.stagger_ms, 50);
    }
}
