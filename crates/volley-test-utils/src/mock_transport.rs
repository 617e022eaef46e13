// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion transport for deterministic testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use volley_core::traits::{CompletionTransport, PluginAdapter, StreamOutcome};
use volley_core::types::{AdapterType, CompletionRequest, HealthStatus};
use volley_core::VolleyError;

/// What the mock does for one slot.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Deliver the increments in order, then finish.
    Tokens(Vec<String>),
    /// Fail with a transport error before any increment.
    Fail(String),
    /// Deliver the increments, then fail.
    TokensThenFail(Vec<String>, String),
    /// Never produce anything until cancelled.
    Hang,
    /// Panic inside the transport call.
    Panic,
}

impl MockReply {
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Tokens(tokens.into_iter().map(Into::into).collect())
    }
}

/// A transport that replays [`MockReply`] scripts keyed by slot index.
///
/// Honors the same contract as the HTTP transport: an already-cancelled
/// token yields `Cancelled` before anything else, and cancellation observed
/// between increments stops delivery.
pub struct MockTransport {
    replies: HashMap<usize, MockReply>,
    default_reply: MockReply,
    token_delay: Duration,
    require_credential: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockTransport {
    /// Every slot streams `"mock response"` unless scripted otherwise.
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            default_reply: MockReply::tokens(["mock response"]),
            token_delay: Duration::ZERO,
            require_credential: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, slot_index: usize, reply: MockReply) -> Self {
        self.replies.insert(slot_index, reply);
        self
    }

    pub fn default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Sleeps before each increment, giving tests a window to abort.
    pub fn token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    /// Fails with [`VolleyError::MissingCredential`] when the request has no
    /// non-empty credential.
    pub fn requiring_credential(mut self) -> Self {
        self.require_credential = true;
        self
    }

    /// Number of `stream_completion` invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests that got past the cancellation and credential checks.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    async fn deliver(
        &self,
        tokens: &[String],
        cancel: &CancellationToken,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Option<StreamOutcome> {
        for token in tokens {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Some(StreamOutcome::Cancelled),
                _ = tokio::time::sleep(self.token_delay) => {}
            }
            on_delta(token);
        }
        if cancel.is_cancelled() {
            Some(StreamOutcome::Cancelled)
        } else {
            None
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, VolleyError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamOutcome, VolleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if cancel.is_cancelled() {
            return Ok(StreamOutcome::Cancelled);
        }
        if self.require_credential
            && request.credential.as_deref().is_none_or(str::is_empty)
        {
            return Err(VolleyError::MissingCredential);
        }
        self.requests.lock().await.push(request.clone());

        let reply = self
            .replies
            .get(&request.slot_index)
            .unwrap_or(&self.default_reply)
            .clone();

        match reply {
            MockReply::Tokens(tokens) => Ok(self
                .deliver(&tokens, cancel, on_delta)
                .await
                .unwrap_or(StreamOutcome::Finished)),
            MockReply::Fail(message) => Err(VolleyError::transport(message)),
            MockReply::TokensThenFail(tokens, message) => {
                match self.deliver(&tokens, cancel, on_delta).await {
                    Some(outcome) => Ok(outcome),
                    None => Err(VolleyError::transport(message)),
                }
            }
            MockReply::Hang => {
                cancel.cancelled().await;
                Ok(StreamOutcome::Cancelled)
            }
            MockReply::Panic => panic!("mock transport panic for slot {}", request.slot_index),
        }
    }
}
