// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State shared by every task that touches one batch.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use volley_core::{BatchId, CompletionRequest, GenerationConfig, GenerationSlot, HistoryRecord};

use crate::aggregate::ResultAggregate;
use crate::latch::FinalizationLatch;

/// Outcome published by the single finalizer of a batch.
#[derive(Debug, Clone)]
pub struct Finalized {
    /// Slots after residual coercion; all terminal.
    pub slots: Vec<GenerationSlot>,
    /// The history record, when it was written by this finalization.
    pub record: Option<HistoryRecord>,
}

/// One run of N slots over a fixed prompt pair and config.
pub struct Batch {
    id: BatchId,
    request: CompletionRequest,
    system_prompt: String,
    user_prompt: String,
    aggregate: Arc<ResultAggregate>,
    cancel: CancellationToken,
    latch: FinalizationLatch,
    finalized: watch::Sender<Option<Finalized>>,
}

impl Batch {
    pub(crate) fn new(
        system_prompt: String,
        user_prompt: String,
        config: GenerationConfig,
        credential: Option<String>,
    ) -> Self {
        let aggregate = Arc::new(ResultAggregate::new(config.output_count));
        let request = CompletionRequest::for_prompts(&system_prompt, &user_prompt, config, credential);
        let (finalized, _) = watch::channel(None);
        Self {
            id: BatchId::generate(),
            request,
            system_prompt,
            user_prompt,
            aggregate,
            cancel: CancellationToken::new(),
            latch: FinalizationLatch::new(),
            finalized,
        }
    }

    pub fn id(&self) -> &BatchId {
        &self.id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.request.config
    }

    pub fn aggregate(&self) -> &Arc<ResultAggregate> {
        &self.aggregate
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finalized(&self) -> bool {
        self.latch.is_fired()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn latch(&self) -> &FinalizationLatch {
        &self.latch
    }

    pub(crate) fn request_for_slot(&self, slot_index: usize) -> CompletionRequest {
        self.request.for_slot(slot_index)
    }

    pub(crate) fn publish(&self, finalized: Finalized) {
        self.finalized.send_replace(Some(finalized));
    }

    /// Waits until some finalizer has published the outcome.
    pub async fn finalized(&self) -> Option<Finalized> {
        let mut rx = self.finalized.subscribe();
        rx.wait_for(Option::is_some).await.ok().and_then(|value| value.clone())
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("id", &self.id)
            .field("slots", &self.aggregate.len())
            .field("cancelled", &self.is_cancelled())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}
