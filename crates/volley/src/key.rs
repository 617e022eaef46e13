// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley key` subcommands: the API key kept in the settings store.

use std::io::IsTerminal;

use clap::Subcommand;
use volley_core::{SettingsStore, VolleyError};

use crate::output::Style;

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Store an API key. Prompts without echo when no key is given.
    Set { key: Option<String> },
    /// Show the stored key, masked unless --reveal.
    Show {
        #[arg(long)]
        reveal: bool,
    },
    /// Remove the stored key.
    Clear,
}

pub async fn run_key(
    store: &dyn SettingsStore,
    command: KeyCommand,
    style: Style,
) -> Result<(), VolleyError> {
    match command {
        KeyCommand::Set { key } => {
            let key = match key {
                Some(key) => key,
                None => read_key()?,
            };
            store.set_api_key(key.trim()).await?;
            println!("{}", style.success("API key saved"));
        }
        KeyCommand::Show { reveal } => match store.get_api_key().await? {
            Some(key) if reveal => println!("{key}"),
            Some(key) => println!("{}", mask(&key)),
            None => println!("{}", style.muted("no API key stored")),
        },
        KeyCommand::Clear => {
            store.set_api_key("").await?;
            println!("{}", style.success("API key cleared"));
        }
    }
    Ok(())
}

fn read_key() -> Result<String, VolleyError> {
    if !std::io::stdin().is_terminal() {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| VolleyError::Internal(format!("failed to read key from stdin: {e}")))?;
        return Ok(line);
    }
    rpassword::prompt_password("API key: ")
        .map_err(|e| VolleyError::Internal(format!("failed to read key: {e}")))
}

/// Keeps the first and last four characters of long keys.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
