// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming completion transport trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::VolleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CompletionRequest;

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The response body ended.
    Finished,
    /// The cancellation token fired before or during the stream.
    Cancelled,
}

/// Adapter for a streaming chat-completion endpoint.
#[async_trait]
pub trait CompletionTransport: PluginAdapter {
    /// Issues one streaming request and feeds every non-empty content
    /// increment to `on_delta` in arrival order.
    ///
    /// Cancellation observed at any point resolves to
    /// `Ok(StreamOutcome::Cancelled)`; after it fires no further increments
    /// are delivered.
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamOutcome, VolleyError>;
}
