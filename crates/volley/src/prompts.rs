// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley prompts` subcommands.

use std::path::PathBuf;

use clap::Subcommand;
use volley_core::{PromptKind, PromptStore, SavedPrompt, VolleyError};

use crate::output::{self, Style};

#[derive(Subcommand, Debug)]
pub enum PromptsCommand {
    /// List saved prompts, newest first.
    List {
        /// `system` or `user`.
        kind: PromptKind,
    },
    /// Save a prompt (or overwrite one with the same id).
    Save {
        kind: PromptKind,
        #[arg(long)]
        title: String,
        /// Prompt text; use --file to read it from disk.
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Overwrite the prompt with this id.
        #[arg(long)]
        id: Option<String>,
    },
    Delete {
        kind: PromptKind,
        id: String,
    },
    Rename {
        kind: PromptKind,
        id: String,
        title: String,
    },
    /// Toggle the favorite flag.
    Favorite {
        kind: PromptKind,
        id: String,
    },
}

pub async fn run_prompts(
    store: &dyn PromptStore,
    command: PromptsCommand,
    style: Style,
) -> Result<(), VolleyError> {
    let prompts = match command {
        PromptsCommand::List { kind } => store.list_prompts(kind).await?,
        PromptsCommand::Save {
            kind,
            title,
            content,
            file,
            id,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    VolleyError::Config(format!("failed to read {}: {e}", path.display()))
                })?,
                (None, None) => String::new(),
            };
            let mut prompt = SavedPrompt::new(kind, title, content);
            if let Some(id) = id {
                prompt.id = id;
            }
            store.save_prompt(&prompt).await?
        }
        PromptsCommand::Delete { kind, id } => store.delete_prompt(kind, &id).await?,
        PromptsCommand::Rename { kind, id, title } => store.rename_prompt(kind, &id, &title).await?,
        PromptsCommand::Favorite { kind, id } => store.toggle_prompt_favorite(kind, &id).await?,
    };
    output::print_prompts(&prompts, style);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_test_utils::MemoryStore;

    #[tokio::test]
    async fn save_rename_favorite_delete() {
        let store = MemoryStore::new();
        let style = Style::plain();

        run_prompts(
            &store,
            PromptsCommand::Save {
                kind: PromptKind::User,
                title: "Greeting".into(),
                content: Some("Say hi".into()),
                file: None,
                id: Some("g1".into()),
            },
            style,
        )
        .await
        .unwrap();

        run_prompts(
            &store,
            PromptsCommand::Rename {
                kind: PromptKind::User,
                id: "g1".into(),
                title: "Hello".into(),
            },
            style,
        )
        .await
        .unwrap();
        run_prompts(
            &store,
            PromptsCommand::Favorite {
                kind: PromptKind::User,
                id: "g1".into(),
            },
            style,
        )
        .await
        .unwrap();

        let prompts = store.list_prompts(PromptKind::User).await.unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].title, "Hello");
        assert!(prompts[0].is_favorite);
        assert!(store.list_prompts(PromptKind::System).await.unwrap().is_empty());

        run_prompts(
            &store,
            PromptsCommand::Delete {
                kind: PromptKind::User,
                id: "g1".into(),
            },
            style,
        )
        .await
        .unwrap();
        assert!(store.list_prompts(PromptKind::User).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_reads_content_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "You are a careful reviewer.").unwrap();
        let store = MemoryStore::new();

        run_prompts(
            &store,
            PromptsCommand::Save {
                kind: PromptKind::System,
                title: "Reviewer".into(),
                content: None,
                file: Some(path),
                id: None,
            },
            Style::plain(),
        )
        .await
        .unwrap();

        let prompts = store.list_prompts(PromptKind::System).await.unwrap();
        assert_eq!(prompts[0].content, "You are a careful reviewer.");
    }
}
