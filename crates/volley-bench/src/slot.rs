// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives one slot from Pending to a terminal status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use volley_core::{CompletionRequest, CompletionTransport, SlotStatus};

use crate::aggregate::ResultAggregate;

/// Terminal state a runner resolved with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotResolution {
    pub slot_index: usize,
    pub status: SlotStatus,
}

pub struct SlotRunner {
    request: CompletionRequest,
    transport: Arc<dyn CompletionTransport>,
    aggregate: Arc<ResultAggregate>,
    cancel: CancellationToken,
    stagger: Duration,
}

impl SlotRunner {
    pub fn new(
        request: CompletionRequest,
        transport: Arc<dyn CompletionTransport>,
        aggregate: Arc<ResultAggregate>,
        cancel: CancellationToken,
        stagger: Duration,
    ) -> Self {
        Self {
            request,
            transport,
            aggregate,
            cancel,
            stagger,
        }
    }

    pub fn slot_index(&self) -> usize {
        self.request.slot_index
    }

    /// Startup delay for this slot: `slot_index * stagger`.
    pub fn delay(&self) -> Duration {
        let factor = u32::try_from(self.slot_index()).unwrap_or(u32::MAX);
        self.stagger.saturating_mul(factor)
    }

    /// Runs the slot to completion. Never fails: transport errors become an
    /// Errored slot, cancellation becomes a Completed one.
    pub async fn run(self) -> SlotResolution {
        let index = self.slot_index();
        let delay = self.delay();

        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(slot = index, "cancelled during stagger delay");
                    return self.resolve_completed(None);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if self.cancel.is_cancelled() {
            debug!(slot = index, "cancelled before start");
            return self.resolve_completed(None);
        }

        let started = Instant::now();
        let aggregate = self.aggregate.clone();
        let cancel = self.cancel.clone();
        let mut on_delta = move |text: &str| {
            // Increments racing an abort are dropped.
            if !cancel.is_cancelled() {
                aggregate.append(index, text);
            }
        };

        let result = self
            .transport
            .stream_completion(&self.request, &self.cancel, &mut on_delta)
            .await;
        let elapsed = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

        match result {
            Ok(outcome) => {
                debug!(slot = index, ?outcome, "slot finished");
                self.resolve_completed(elapsed)
            }
            Err(e) if self.cancel.is_cancelled() => {
                debug!(slot = index, error = %e, "error after abort, treating as completed");
                self.resolve_completed(elapsed)
            }
            Err(e) => {
                warn!(slot = index, error = %e, "slot failed");
                self.aggregate.fail(index, e.to_string(), elapsed);
                self.resolution()
            }
        }
    }

    fn resolve_completed(&self, duration_ms: Option<u64>) -> SlotResolution {
        self.aggregate.complete(self.slot_index(), duration_ms);
        self.resolution()
    }

    fn resolution(&self) -> SlotResolution {
        let index = self.slot_index();
        let status = self
            .aggregate
            .slot(index)
            .map_or(SlotStatus::Completed, |slot| slot.status);
        SlotResolution {
            slot_index: index,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use volley_core::{
        AdapterType, GenerationConfig, HealthStatus, PluginAdapter, StreamOutcome, VolleyError,
    };
    use volley_test_utils::{MockReply, MockTransport};

    fn request(slot_index: usize) -> CompletionRequest {
        CompletionRequest::for_prompts("sys", "user", GenerationConfig::default(), None)
            .for_slot(slot_index)
    }

    fn runner(
        slot_index: usize,
        transport: Arc<dyn CompletionTransport>,
        aggregate: &Arc<ResultAggregate>,
        cancel: &CancellationToken,
        stagger: Duration,
    ) -> SlotRunner {
        SlotRunner::new(
            request(slot_index),
            transport,
            aggregate.clone(),
            cancel.clone(),
            stagger,
        )
    }

    #[tokio::test]
    async fn increments_accumulate_in_order() {
        let transport = Arc::new(MockTransport::new().reply(0, MockReply::tokens(["Hel", "lo"])));
        let aggregate = Arc::new(ResultAggregate::new(1));
        let cancel = CancellationToken::new();

        let resolution = runner(0, transport, &aggregate, &cancel, Duration::ZERO).run().await;

        assert_eq!(resolution.status, SlotStatus::Completed);
        let slot = aggregate.slot(0).unwrap();
        assert_eq!(slot.content, "Hello");
        assert!(slot.duration_ms.is_some());
    }

    #[tokio::test]
    async fn transport_error_marks_slot_errored() {
        let transport = Arc::new(MockTransport::new().default_reply(MockReply::Fail("HTTP 429".into())));
        let aggregate = Arc::new(ResultAggregate::new(1));

        let resolution = runner(0, transport, &aggregate, &CancellationToken::new(), Duration::ZERO)
            .run()
            .await;

        assert_eq!(resolution.status, SlotStatus::Errored);
        assert_eq!(aggregate.slot(0).unwrap().error.as_deref(), Some("HTTP 429"));
    }

    #[tokio::test]
    async fn partial_content_survives_mid_stream_error() {
        let transport = Arc::new(
            MockTransport::new()
                .default_reply(MockReply::TokensThenFail(vec!["par".into()], "reset".into())),
        );
        let aggregate = Arc::new(ResultAggregate::new(1));

        runner(0, transport, &aggregate, &CancellationToken::new(), Duration::ZERO)
            .run()
            .await;

        let slot = aggregate.slot(0).unwrap();
        assert_eq!(slot.status, SlotStatus::Errored);
        assert_eq!(slot.content, "par");
    }

    #[tokio::test(start_paused = true)]
    async fn stagger_delay_scales_with_index() {
        let transport = Arc::new(MockTransport::new());
        let aggregate = Arc::new(ResultAggregate::new(4));
        let cancel = CancellationToken::new();
        let stagger = Duration::from_millis(50);

        let slot3 = runner(3, transport.clone(), &aggregate, &cancel, stagger);
        assert_eq!(slot3.delay(), Duration::from_millis(150));

        let started = tokio::time::Instant::now();
        slot3.run().await;
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn cancel_during_stagger_skips_transport() {
        let transport = Arc::new(MockTransport::new());
        let aggregate = Arc::new(ResultAggregate::new(2));
        let cancel = CancellationToken::new();

        let slot = runner(1, transport.clone(), &aggregate, &cancel, Duration::from_secs(60));
        let task = tokio::spawn(slot.run());
        cancel.cancel();
        let resolution = task.await.unwrap();

        assert_eq!(resolution.status, SlotStatus::Completed);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(aggregate.slot(1).unwrap().content, "");
    }

    #[tokio::test]
    async fn hanging_transport_resolves_completed_on_abort() {
        let transport = Arc::new(MockTransport::new().default_reply(MockReply::Hang));
        let aggregate = Arc::new(ResultAggregate::new(1));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(runner(0, transport, &aggregate, &cancel, Duration::ZERO).run());
        tokio::task::yield_now().await;
        cancel.cancel();

        assert_eq!(task.await.unwrap().status, SlotStatus::Completed);
    }

    /// Cancels the token itself, then keeps emitting and finally errors.
    struct LateTokens;

    #[async_trait]
    impl PluginAdapter for LateTokens {
        fn name(&self) -> &str {
            "late"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Transport
        }
        async fn health_check(&self) -> Result<HealthStatus, VolleyError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl CompletionTransport for LateTokens {
        async fn stream_completion(
            &self,
            _request: &CompletionRequest,
            cancel: &CancellationToken,
            on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> Result<StreamOutcome, VolleyError> {
            on_delta("before");
            cancel.cancel();
            on_delta("after");
            Err(VolleyError::transport("connection reset"))
        }
    }

    #[tokio::test]
    async fn increments_and_errors_after_abort_are_ignored() {
        let aggregate = Arc::new(ResultAggregate::new(1));
        let resolution = runner(
            0,
            Arc::new(LateTokens),
            &aggregate,
            &CancellationToken::new(),
            Duration::ZERO,
        )
        .run()
        .await;

        let slot = aggregate.slot(0).unwrap();
        assert_eq!(resolution.status, SlotStatus::Completed);
        assert_eq!(slot.content, "before");
        assert!(slot.error.is_none());
    }
}
