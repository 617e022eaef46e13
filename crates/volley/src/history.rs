// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `volley history` subcommands.

use clap::Subcommand;
use volley_core::{HistoryStore, VolleyError};

use crate::output::{self, Style};

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List the most recent runs.
    List {
        /// Only favorites.
        #[arg(long)]
        favorites: bool,
    },
    /// Show one run with every output.
    Show { id: String },
    Delete { id: String },
    /// Toggle the favorite flag.
    Favorite { id: String },
}

pub async fn run_history(
    store: &dyn HistoryStore,
    command: HistoryCommand,
    style: Style,
) -> Result<(), VolleyError> {
    let records = match command {
        HistoryCommand::List { favorites } => {
            let mut records = store.list_history().await?;
            if favorites {
                records.retain(|r| r.is_favorite);
            }
            records
        }
        HistoryCommand::Show { id } => {
            let record = store
                .get_history(&id)
                .await?
                .ok_or_else(|| VolleyError::Config(format!("no run with id {id}")))?;
            output::print_record(&record, style);
            return Ok(());
        }
        HistoryCommand::Delete { id } => store.delete_history(&id).await?,
        HistoryCommand::Favorite { id } => store.toggle_history_favorite(&id).await?,
    };
    output::print_history(&records, style);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::{BatchId, GenerationConfig, GenerationSlot, HistoryRecord};
    use volley_test_utils::MemoryStore;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut slot = GenerationSlot::pending(0);
        slot.append("answer");
        slot.complete(Some(120));
        let record = HistoryRecord::from_slots(
            BatchId("run-1".into()),
            "sys",
            "question",
            &GenerationConfig::default(),
            &[slot],
        );
        store.insert_history(&record).await.unwrap();
        store
    }

    #[tokio::test]
    async fn show_unknown_id_is_an_error() {
        let store = seeded().await;
        let result = run_history(&store, HistoryCommand::Show { id: "nope".into() }, Style::plain()).await;
        assert!(result.unwrap_err().to_string().contains("nope"));
    }

    #[tokio::test]
    async fn favorite_then_delete() {
        let store = seeded().await;
        let style = Style::plain();

        run_history(&store, HistoryCommand::Favorite { id: "run-1".into() }, style)
            .await
            .unwrap();
        assert!(store.get_history("run-1").await.unwrap().unwrap().is_favorite);

        run_history(&store, HistoryCommand::Show { id: "run-1".into() }, style)
            .await
            .unwrap();

        run_history(&store, HistoryCommand::Delete { id: "run-1".into() }, style)
            .await
            .unwrap();
        assert!(store.list_history().await.unwrap().is_empty());
    }
}
