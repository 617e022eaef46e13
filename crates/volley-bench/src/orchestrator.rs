// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch lifecycle: start, fan out, abort, finalize.
//!
//! The orchestrator owns at most one active batch. Starting spawns a driver
//! task that runs one [`SlotRunner`] per slot on a [`JoinSet`] and finalizes
//! once every runner settles. [`BatchOrchestrator::abort`] cancels the shared
//! token and races its own finalization against the driver's; the batch's
//! [`FinalizationLatch`](crate::FinalizationLatch) lets exactly one of them
//! through.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};
use volley_core::{
    BatchId, CompletionTransport, GenerationConfig, GenerationSlot, HistoryRecord, HistoryStore,
    VolleyError, prompts_are_empty,
};

use crate::aggregate::ResultAggregate;
use crate::batch::{Batch, Finalized};
use crate::commit::HistoryCommitter;
use crate::slot::SlotRunner;

/// Default delay between consecutive slot starts.
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(50);

/// Orchestrator state, observable via [`BatchOrchestrator::phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Finalizing,
}

/// Why [`BatchOrchestrator::start`] refused to launch a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartRejected {
    #[error("system and user prompts are both empty")]
    EmptyPrompts,

    #[error("a batch is already running")]
    AlreadyRunning,

    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
}

/// Inputs for one batch.
#[derive(Clone)]
pub struct BatchRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub config: GenerationConfig,
    pub credential: Option<String>,
}

impl BatchRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            config,
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Slot `i` waits `i * stagger` before issuing its request.
    pub stagger: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            stagger: DEFAULT_STAGGER,
        }
    }
}

/// Final state of a batch as seen by whoever started it.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub id: BatchId,
    pub slots: Vec<GenerationSlot>,
    /// Present when the history row was written for this batch.
    pub record: Option<HistoryRecord>,
    pub aborted: bool,
}

/// Returned by [`BatchOrchestrator::start`].
pub struct BatchHandle {
    batch: Arc<Batch>,
    task: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub fn id(&self) -> &BatchId {
        self.batch.id()
    }

    pub fn batch(&self) -> &Arc<Batch> {
        &self.batch
    }

    pub fn aggregate(&self) -> &Arc<ResultAggregate> {
        self.batch.aggregate()
    }

    /// Waits for the batch to finalize.
    pub async fn wait(self) -> Result<BatchReport, VolleyError> {
        self.task
            .await
            .map_err(|e| VolleyError::Internal(format!("batch driver failed: {e}")))
    }
}

struct State {
    phase: Phase,
    active: Option<Arc<Batch>>,
}

struct Inner {
    transport: Arc<dyn CompletionTransport>,
    committer: HistoryCommitter,
    settings: OrchestratorSettings,
    state: Mutex<State>,
    phase: watch::Sender<Phase>,
}

/// Runs batches against a [`CompletionTransport`] and commits them to a
/// [`HistoryStore`]. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct BatchOrchestrator {
    inner: Arc<Inner>,
}

impl BatchOrchestrator {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        history: Arc<dyn HistoryStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            inner: Arc::new(Inner {
                transport,
                committer: HistoryCommitter::new(history),
                settings,
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    active: None,
                }),
                phase,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.inner.phase.subscribe()
    }

    /// The batch currently Running or Finalizing.
    pub fn current(&self) -> Option<Arc<Batch>> {
        self.state().active.clone()
    }

    /// Launches a batch. Must be called within a tokio runtime.
    pub fn start(&self, request: BatchRequest) -> Result<BatchHandle, StartRejected> {
        if prompts_are_empty(&request.system_prompt, &request.user_prompt) {
            return Err(StartRejected::EmptyPrompts);
        }
        let violations = request.config.violations();
        if !violations.is_empty() {
            return Err(StartRejected::InvalidConfig(violations.join("; ")));
        }

        let batch = {
            let mut state = self.state();
            if state.phase != Phase::Idle {
                return Err(StartRejected::AlreadyRunning);
            }
            let batch = Arc::new(Batch::new(
                request.system_prompt,
                request.user_prompt,
                request.config,
                request.credential,
            ));
            state.active = Some(batch.clone());
            self.set_phase(&mut state, Phase::Running);
            batch
        };

        info!(
            batch_id = %batch.id(),
            slots = batch.aggregate().len(),
            model = %batch.config().model,
            "batch started"
        );
        let task = tokio::spawn(self.clone().drive(batch.clone()));
        Ok(BatchHandle { batch, task })
    }

    /// Cancels the running batch and finalizes it without waiting for the
    /// slots. Returns false when nothing is Running.
    pub fn abort(&self) -> bool {
        let batch = {
            let state = self.state();
            match (&state.phase, &state.active) {
                (Phase::Running, Some(batch)) => batch.clone(),
                _ => return false,
            }
        };

        info!(batch_id = %batch.id(), "aborting batch");
        batch.cancel_token().cancel();
        // Without a runtime the driver task is the only finalizer left.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let orchestrator = self.clone();
            runtime.spawn(async move {
                orchestrator.finalize(&batch).await;
            });
        }
        true
    }

    /// Finalizes `batch` if nobody has yet. A second caller gets `None`.
    pub async fn finalize(&self, batch: &Arc<Batch>) -> Option<Finalized> {
        if !batch.latch().try_fire() {
            debug!(batch_id = %batch.id(), "batch already finalized");
            return None;
        }
        self.transition(batch.id(), Phase::Finalizing);

        let coerced = batch.aggregate().finalize_residual();
        let slots = batch.aggregate().snapshot();
        let record = self.inner.committer.commit(batch).await;
        let finalized = Finalized { slots, record };

        self.transition(batch.id(), Phase::Idle);
        batch.publish(finalized.clone());
        info!(
            batch_id = %batch.id(),
            coerced,
            aborted = batch.is_cancelled(),
            committed = finalized.record.is_some(),
            "batch finalized"
        );
        Some(finalized)
    }

    /// Aborts any running batch and waits until it is finalized.
    pub async fn shutdown(&self) {
        let Some(batch) = self.current() else {
            return;
        };
        info!(batch_id = %batch.id(), "shutting down orchestrator");
        batch.cancel_token().cancel();
        if self.finalize(&batch).await.is_none() {
            batch.finalized().await;
        }
    }

    async fn drive(self, batch: Arc<Batch>) -> BatchReport {
        let mut runners = JoinSet::new();
        let mut slot_of_task = HashMap::new();
        for index in 0..batch.aggregate().len() {
            let runner = SlotRunner::new(
                batch.request_for_slot(index),
                self.inner.transport.clone(),
                batch.aggregate().clone(),
                batch.cancel_token().clone(),
                self.inner.settings.stagger,
            );
            let handle = runners.spawn(runner.run());
            slot_of_task.insert(handle.id(), index);
        }

        while let Some(joined) = runners.join_next_with_id().await {
            match joined {
                Ok((_, resolution)) => debug!(
                    batch_id = %batch.id(),
                    slot = resolution.slot_index,
                    status = %resolution.status,
                    "slot resolved"
                ),
                Err(e) => {
                    let slot = slot_of_task.get(&e.id()).copied();
                    error!(batch_id = %batch.id(), ?slot, error = %e, "slot task failed");
                    if let Some(index) = slot {
                        batch.aggregate().fail(index, "slot task panicked", None);
                    }
                }
            }
        }

        let finalized = match self.finalize(&batch).await {
            Some(finalized) => Some(finalized),
            None => batch.finalized().await,
        };
        let (slots, record) = match finalized {
            Some(Finalized { slots, record }) => (slots, record),
            None => (batch.aggregate().snapshot(), None),
        };
        BatchReport {
            id: batch.id().clone(),
            slots,
            record,
            aborted: batch.is_cancelled(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, state: &mut State, phase: Phase) {
        state.phase = phase;
        self.inner.phase.send_replace(phase);
    }

    /// Moves to `phase` only while `id` is still the active batch.
    fn transition(&self, id: &BatchId, phase: Phase) {
        let mut state = self.state();
        if state.active.as_ref().is_some_and(|active| active.id() == id) {
            if phase == Phase::Idle {
                state.active = None;
            }
            self.set_phase(&mut state, phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::{SlotStatus, TerminalStatus};
    use volley_test_utils::{MemoryStore, MockReply, MockTransport};

    fn orchestrator(transport: MockTransport) -> (BatchOrchestrator, Arc<MockTransport>, Arc<MemoryStore>) {
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryStore::new());
        let settings = OrchestratorSettings {
            stagger: Duration::ZERO,
        };
        let orchestrator = BatchOrchestrator::new(transport.clone(), store.clone(), settings);
        (orchestrator, transport, store)
    }

    fn request(output_count: usize) -> BatchRequest {
        let config = GenerationConfig {
            output_count,
            ..GenerationConfig::default()
        };
        BatchRequest::new("You are terse.", "Say hi", config).with_credential(Some("sk-test".into()))
    }

    #[tokio::test]
    async fn every_slot_reaches_a_terminal_state() {
        for n in [1, 7, 20] {
            let (orchestrator, transport, store) = orchestrator(MockTransport::new());
            let report = orchestrator.start(request(n)).unwrap().wait().await.unwrap();

            assert_eq!(report.slots.len(), n);
            for (i, slot) in report.slots.iter().enumerate() {
                assert_eq!(slot.slot_index, i);
                assert_eq!(slot.status, SlotStatus::Completed);
                assert_eq!(slot.content, "mock response");
            }
            assert_eq!(transport.call_count(), n);
            assert!(!report.aborted);
            assert_eq!(report.record.as_ref().unwrap().results.len(), n);
            assert_eq!(store.all_history().await.len(), 1);
            assert_eq!(orchestrator.phase(), Phase::Idle);
        }
    }

    #[tokio::test]
    async fn slots_receive_their_own_index_and_the_prompt_pair() {
        let (orchestrator, transport, _) = orchestrator(MockTransport::new());
        orchestrator.start(request(3)).unwrap().wait().await.unwrap();

        let mut indexes: Vec<usize> = transport.requests().await.iter().map(|r| r.slot_index).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![0, 1, 2]);
        let first = &transport.requests().await[0];
        assert_eq!(first.messages[0].content, "You are terse.");
        assert_eq!(first.messages[1].content, "Say hi");
    }

    #[tokio::test]
    async fn abort_when_idle_is_a_noop() {
        let (orchestrator, _, store) = orchestrator(MockTransport::new());
        assert!(!orchestrator.abort());
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn start_while_running_is_rejected_and_running_batch_is_untouched() {
        let (orchestrator, _, store) = orchestrator(MockTransport::new().default_reply(MockReply::Hang));
        let handle = orchestrator.start(request(2)).unwrap();

        let second = orchestrator.start(request(5));
        assert!(matches!(second, Err(StartRejected::AlreadyRunning)));
        assert_eq!(orchestrator.current().unwrap().id(), handle.id());
        assert!(!handle.batch().is_cancelled());
        assert_eq!(orchestrator.phase(), Phase::Running);

        assert!(orchestrator.abort());
        let report = handle.wait().await.unwrap();
        assert_eq!(report.slots.len(), 2);
        assert!(report.aborted);
        assert_eq!(store.all_history().await.len(), 1);

        // Idle again: a new batch may start.
        assert!(orchestrator.start(request(1)).is_ok());
    }

    #[tokio::test]
    async fn empty_prompts_start_nothing() {
        let (orchestrator, transport, store) = orchestrator(MockTransport::new());
        let result = orchestrator.start(BatchRequest::new(" ", "\t\n", GenerationConfig::default()));

        assert!(matches!(result, Err(StartRejected::EmptyPrompts)));
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(orchestrator.current().is_none());
        assert_eq!(transport.call_count(), 0);
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let (orchestrator, transport, _) = orchestrator(MockTransport::new());
        let result = orchestrator.start(request(0));

        match result {
            Err(StartRejected::InvalidConfig(message)) => assert!(message.contains("output_count")),
            other => panic!("expected InvalidConfig, got {:?}", other.err()),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn increments_concatenate_per_slot_without_interleaving() {
        let transport = MockTransport::new()
            .reply(0, MockReply::tokens(["Hel", "lo"]))
            .reply(1, MockReply::tokens(["Wor", "ld"]))
            .token_delay(Duration::from_millis(1));
        let (orchestrator, _, _) = orchestrator(transport);

        let report = orchestrator.start(request(2)).unwrap().wait().await.unwrap();

        assert_eq!(report.slots[0].content, "Hello");
        assert_eq!(report.slots[1].content, "World");
    }

    #[tokio::test]
    async fn one_failing_slot_does_not_affect_its_sibling() {
        let transport = MockTransport::new()
            .reply(0, MockReply::Fail("HTTP 429".into()))
            .reply(1, MockReply::tokens(["OK"]));
        let (orchestrator, _, store) = orchestrator(transport);

        let report = orchestrator.start(request(2)).unwrap().wait().await.unwrap();

        assert_eq!(report.slots[0].status, SlotStatus::Errored);
        assert_eq!(report.slots[0].error.as_deref(), Some("HTTP 429"));
        assert_eq!(report.slots[1].status, SlotStatus::Completed);
        assert_eq!(report.slots[1].content, "OK");

        let stored = &store.all_history().await[0];
        assert_eq!(stored.results[0].status, TerminalStatus::Errored);
        assert_eq!(stored.results[1].status, TerminalStatus::Completed);
        assert_eq!(stored.results[1].content, "OK");
    }

    #[tokio::test]
    async fn missing_credential_errors_every_slot_without_requests() {
        let (orchestrator, transport, store) = orchestrator(MockTransport::new().requiring_credential());
        let report = orchestrator
            .start(request(3).with_credential(None))
            .unwrap()
            .wait()
            .await
            .unwrap();

        for slot in &report.slots {
            assert_eq!(slot.status, SlotStatus::Errored);
            assert!(slot.error.as_deref().unwrap().starts_with("Missing API Key"));
        }
        assert!(transport.requests().await.is_empty());
        assert_eq!(store.all_history().await.len(), 1);
    }

    #[tokio::test]
    async fn abort_mid_stream_leaves_no_errors() {
        let tokens: Vec<String> = (0..50).map(|i| format!("t{i} ")).collect();
        let transport = MockTransport::new()
            .default_reply(MockReply::Tokens(tokens))
            .token_delay(Duration::from_millis(20));
        let (orchestrator, _, store) = orchestrator(transport);

        let handle = orchestrator.start(request(3)).unwrap();
        let mut revisions = handle.aggregate().subscribe();
        revisions.changed().await.unwrap();
        assert!(orchestrator.abort());
        let report = handle.wait().await.unwrap();

        assert!(report.aborted);
        assert!(report.slots.iter().all(|s| s.status == SlotStatus::Completed));
        assert!(report.slots.iter().all(|s| s.error.is_none()));
        assert!(report.slots.iter().any(|s| !s.content.is_empty()));
        assert!(report.slots.iter().all(|s| s.content.len() < 50 * 3));
        assert_eq!(store.insert_calls(), 1);
        assert_eq!(orchestrator.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn abort_before_any_slot_runs_skips_the_transport() {
        let (orchestrator, transport, store) = orchestrator(MockTransport::new());
        let handle = orchestrator.start(request(4)).unwrap();
        // Current-thread runtime: no runner has been polled yet.
        assert!(orchestrator.abort());
        let report = handle.wait().await.unwrap();

        assert_eq!(transport.call_count(), 0);
        assert!(report.slots.iter().all(|s| s.status == SlotStatus::Completed));
        assert_eq!(store.all_history().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_finalizers_commit_exactly_once() {
        for round in 0..20u64 {
            let transport = MockTransport::new()
                .default_reply(MockReply::tokens(["a", "b", "c"]))
                .token_delay(Duration::from_millis(round % 3));
            let (orchestrator, _, store) = orchestrator(transport);
            store.set_insert_delay(Duration::from_millis(5)).await;

            let handle = orchestrator.start(request(5)).unwrap();
            let batch = handle.batch().clone();
            tokio::time::sleep(Duration::from_millis(round % 4)).await;

            let (_, first, second) = tokio::join!(
                async { orchestrator.abort() },
                orchestrator.finalize(&batch),
                orchestrator.finalize(&batch),
            );
            let report = handle.wait().await.unwrap();

            assert!(!(first.is_some() && second.is_some()));
            assert!(report.slots.iter().all(|s| s.status.is_terminal()));
            assert_eq!(store.insert_calls(), 1, "round {round}");
            assert_eq!(store.all_history().await.len(), 1);
            assert!(orchestrator.finalize(&batch).await.is_none());
            assert_eq!(orchestrator.phase(), Phase::Idle);
        }
    }

    #[tokio::test]
    async fn panicking_slot_is_errored_and_siblings_complete() {
        let (orchestrator, _, _) = orchestrator(MockTransport::new().reply(1, MockReply::Panic));
        let report = orchestrator.start(request(3)).unwrap().wait().await.unwrap();

        assert_eq!(report.slots[0].status, SlotStatus::Completed);
        assert_eq!(report.slots[1].status, SlotStatus::Errored);
        assert_eq!(report.slots[1].error.as_deref(), Some("slot task panicked"));
        assert_eq!(report.slots[2].status, SlotStatus::Completed);
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_the_batch() {
        let (orchestrator, _, store) = orchestrator(MockTransport::new());
        store.fail_inserts(true);

        let report = orchestrator.start(request(2)).unwrap().wait().await.unwrap();

        assert!(report.record.is_none());
        assert!(report.slots.iter().all(|s| s.status == SlotStatus::Completed));
        assert_eq!(orchestrator.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn phase_moves_through_running_back_to_idle() {
        let (orchestrator, _, _) = orchestrator(MockTransport::new());
        let mut phases = orchestrator.subscribe_phase();
        assert_eq!(*phases.borrow(), Phase::Idle);

        let handle = orchestrator.start(request(2)).unwrap();
        assert_eq!(*phases.borrow_and_update(), Phase::Running);
        assert_eq!(orchestrator.phase(), Phase::Running);

        handle.wait().await.unwrap();
        phases.wait_for(|p| *p == Phase::Idle).await.unwrap();
        assert!(orchestrator.current().is_none());
    }

    #[tokio::test]
    async fn shutdown_aborts_and_waits_for_finalization() {
        let (orchestrator, _, store) = orchestrator(MockTransport::new().default_reply(MockReply::Hang));
        let handle = orchestrator.start(request(3)).unwrap();
        tokio::task::yield_now().await;

        orchestrator.shutdown().await;

        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert_eq!(store.all_history().await.len(), 1);
        let report = handle.wait().await.unwrap();
        assert!(report.aborted);
        assert!(report.slots.iter().all(|s| s.status == SlotStatus::Completed));
    }

    #[tokio::test]
    async fn shutdown_when_idle_returns_immediately() {
        let (orchestrator, _, _) = orchestrator(MockTransport::new());
        orchestrator.shutdown().await;
        assert_eq!(orchestrator.phase(), Phase::Idle);
    }
}
