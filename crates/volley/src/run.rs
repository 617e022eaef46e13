// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley run` command implementation.
//!
//! Starts one batch, redraws a progress line on every slot change, and
//! prints every slot once the batch is finalized. Ctrl+C aborts the batch;
//! whatever streamed so far is still committed to history.

use std::path::PathBuf;

use clap::Args;
use tracing::info;
use volley_bench::{BatchReport, BatchRequest};
use volley_config::VolleyConfig;
use volley_core::{CompletionRequest, GenerationConfig, StorageAdapter, ThinkingMode, VolleyError};
use volley_openai::types::ChatCompletionRequest;

use crate::context;
use crate::output::{self, Progress, Style};
use crate::shutdown;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// System prompt text.
    #[arg(short, long, conflicts_with = "system_file")]
    pub system: Option<String>,

    /// Read the system prompt from a file.
    #[arg(long)]
    pub system_file: Option<PathBuf>,

    /// User prompt text.
    #[arg(short, long, conflicts_with = "user_file")]
    pub user: Option<String>,

    /// Read the user prompt from a file.
    #[arg(long)]
    pub user_file: Option<PathBuf>,

    /// Number of parallel outputs (1-20).
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(short, long)]
    pub temperature: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub frequency_penalty: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub presence_penalty: Option<f64>,

    /// `enabled` or `disabled`.
    #[arg(long)]
    pub thinking: Option<ThinkingMode>,

    /// Use this key for the run instead of the stored one.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Print the final slots as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the request body each slot would send, then exit.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    fn generation_config(&self, config: &VolleyConfig) -> GenerationConfig {
        let mut generation = config.generation.to_generation_config();
        if let Some(model) = &self.model {
            generation.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            generation.temperature = temperature;
        }
        if let Some(penalty) = self.frequency_penalty {
            generation.frequency_penalty = penalty;
        }
        if let Some(penalty) = self.presence_penalty {
            generation.presence_penalty = penalty;
        }
        if let Some(thinking) = self.thinking {
            generation.thinking = thinking;
        }
        if let Some(count) = self.count {
            generation.output_count = count;
        }
        generation
    }
}

fn read_prompt(text: Option<String>, file: Option<&PathBuf>) -> Result<String, VolleyError> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| VolleyError::Config(format!("failed to read {}: {e}", path.display()))),
        (None, None) => Ok(String::new()),
    }
}

pub async fn run_batch(config: &VolleyConfig, args: RunArgs, style: Style) -> Result<(), VolleyError> {
    let generation = args.generation_config(config);
    let system = read_prompt(args.system, args.system_file.as_ref())?;
    let user = read_prompt(args.user, args.user_file.as_ref())?;

    if args.dry_run {
        println!("{}", payload_preview(&system, &user, generation)?);
        return Ok(());
    }

    let store = context::open_store(config).await?;
    let transport = context::transport(config)?;
    let credential = context::credential(store.as_ref(), config, args.api_key).await;
    let orchestrator = context::orchestrator(config, transport, store.clone());

    let request = BatchRequest::new(system, user, generation).with_credential(credential);
    let handle = orchestrator
        .start(request)
        .map_err(|e| VolleyError::Config(e.to_string()))?;
    info!(batch_id = %handle.id(), "run started");

    let signals = shutdown::install_signal_handler();
    let aggregate = handle.aggregate().clone();
    let mut revisions = aggregate.subscribe();
    let mut progress = Progress::new(style);
    let mut aborting = false;

    let wait = handle.wait();
    tokio::pin!(wait);
    let report = loop {
        tokio::select! {
            report = &mut wait => break report?,
            _ = signals.cancelled(), if !aborting => {
                aborting = true;
                orchestrator.abort();
                progress.update(&aggregate.snapshot(), aborting);
            }
            Ok(()) = revisions.changed() => progress.update(&aggregate.snapshot(), aborting),
        }
    };
    progress.finish();

    print_report(&report, args.json, style);
    store.close().await
}

/// Pretty JSON of the streaming request body, without the credential.
fn payload_preview(
    system: &str,
    user: &str,
    generation: GenerationConfig,
) -> Result<String, VolleyError> {
    if system.trim().is_empty() && user.trim().is_empty() {
        return Err(VolleyError::Config(
            "system and user prompts are both empty".to_string(),
        ));
    }
    generation.validate()?;

    let request = CompletionRequest::for_prompts(system, user, generation, None);
    serde_json::to_string_pretty(&ChatCompletionRequest::streaming(&request))
        .map_err(|e| VolleyError::Internal(format!("failed to encode request body: {e}")))
}

fn print_report(report: &BatchReport, json: bool, style: Style) {
    if json {
        let value = serde_json::json!({
            "id": report.id,
            "aborted": report.aborted,
            "committed": report.record.is_some(),
            "slots": report.slots,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        );
        return;
    }

    output::print_slots(&report.slots, style);
    let mut summary = format!("run {}", report.id);
    if report.aborted {
        summary.push_str(" (aborted)");
    }
    if report.record.is_none() {
        summary.push_str(", not saved to history");
    }
    println!("{}", style.muted(&summary));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> RunArgs {
        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: RunArgs,
        }
        let argv = std::iter::once("run").chain(extra.iter().copied());
        <Wrapper as clap::Parser>::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn overrides_apply_on_top_of_config_defaults() {
        let config = VolleyConfig::default();
        let generation = args(&["-n", "6", "--model", "m2", "--presence-penalty", "-1.5"])
            .generation_config(&config);
        assert_eq!(generation.output_count, 6);
        assert_eq!(generation.model, "m2");
        assert_eq!(generation.presence_penalty, -1.5);
        assert_eq!(generation.temperature, config.generation.temperature);
    }

    #[test]
    fn prompt_files_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system.txt");
        std::fs::write(&path, "from file").unwrap();

        assert_eq!(read_prompt(None, Some(&path)).unwrap(), "from file");
        assert_eq!(read_prompt(Some("inline".into()), None).unwrap(), "inline");
        assert_eq!(read_prompt(None, None).unwrap(), "");
        assert!(read_prompt(None, Some(&dir.path().join("missing.txt"))).is_err());
    }

    #[test]
    fn dry_run_prints_the_streaming_body() {
        let run = args(&["-s", "be terse", "-u", "hi", "--dry-run", "-m", "m2", "-t", "0.3"]);
        assert!(run.dry_run);
        let generation = run.generation_config(&VolleyConfig::default());

        let body: serde_json::Value =
            serde_json::from_str(&payload_preview("be terse", "hi", generation).unwrap()).unwrap();
        assert_eq!(body["model"], "m2");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be terse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn dry_run_rejects_what_a_real_run_would() {
        let config = VolleyConfig::default();
        let generation = args(&[]).generation_config(&config);
        assert!(payload_preview("", "  ", generation).is_err());

        let too_many = args(&["-n", "21"]).generation_config(&config);
        assert!(payload_preview("s", "u", too_many).is_err());
    }

    #[test]
    fn system_text_and_file_conflict() {
        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: RunArgs,
        }
        let result = <Wrapper as clap::Parser>::try_parse_from([
            "run", "-s", "x", "--system-file", "y.txt",
        ]);
        assert!(result.is_err());
    }
}
