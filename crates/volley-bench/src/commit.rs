// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persists a finalized batch to history, at most once.

use std::sync::Arc;

use tracing::{debug, info, warn};
use volley_core::{HistoryRecord, HistoryStore, prompts_are_empty};

use crate::batch::Batch;

/// Writes finalized batches to a [`HistoryStore`].
///
/// Persistence failures are logged and swallowed: a batch is never reported
/// as failed because its history row could not be written.
#[derive(Clone)]
pub struct HistoryCommitter {
    store: Arc<dyn HistoryStore>,
}

impl HistoryCommitter {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Returns the record when this call wrote it.
    pub async fn commit(&self, batch: &Batch) -> Option<HistoryRecord> {
        self.commit_and_list(batch).await.map(|(record, _)| record)
    }

    /// Like [`commit`](Self::commit), also returning the refreshed history
    /// list from the store.
    pub async fn commit_and_list(&self, batch: &Batch) -> Option<(HistoryRecord, Vec<HistoryRecord>)> {
        let batch_id = batch.id().as_str();
        if prompts_are_empty(batch.system_prompt(), batch.user_prompt()) {
            debug!(batch_id, "empty prompts, nothing to commit");
            return None;
        }

        let record = HistoryRecord::from_slots(
            batch.id().clone(),
            batch.system_prompt(),
            batch.user_prompt(),
            batch.config(),
            &batch.aggregate().snapshot(),
        );

        match self.store.get_history(batch_id).await {
            Ok(Some(_)) => {
                debug!(batch_id, "run already in history, skipping insert");
                return None;
            }
            Ok(None) => {}
            Err(e) => warn!(batch_id, error = %e, "history lookup failed, inserting anyway"),
        }

        match self.store.insert_history(&record).await {
            Ok(history) => {
                info!(batch_id, slots = record.results.len(), "run committed to history");
                Some((record, history))
            }
            Err(e) => {
                warn!(batch_id, error = %e, "failed to commit run to history");
                None
            }
        }
    }
}
