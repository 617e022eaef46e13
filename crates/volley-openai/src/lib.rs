// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming transport for OpenAI-compatible chat-completion endpoints.
//!
//! This crate implements [`CompletionTransport`] over HTTP + SSE. Credential
//! resolution order: explicit request credential, then each configured
//! environment variable, then [`VolleyError::MissingCredential`].

pub mod client;
pub mod sse;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::SecretString;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use volley_config::model::EndpointConfig;
use volley_core::error::VolleyError;
use volley_core::traits::{CompletionTransport, PluginAdapter, StreamOutcome};
use volley_core::types::{AdapterType, CompletionRequest, HealthStatus};

use crate::client::CompletionClient;
use crate::sse::{FrameStream, SseFrame};
use crate::types::ChatCompletionRequest;

/// Result of a credential check against the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub success: bool,
    pub message: String,
}

impl Verification {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// OpenAI-compatible transport implementing [`CompletionTransport`].
pub struct OpenAiTransport {
    client: CompletionClient,
    env_fallbacks: Vec<String>,
}

impl OpenAiTransport {
    /// Creates a transport for `url` with the default env fallbacks.
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, VolleyError> {
        Ok(Self {
            client: CompletionClient::new(url, connect_timeout)?,
            env_fallbacks: EndpointConfig::default().env_fallbacks,
        })
    }

    pub fn from_config(config: &EndpointConfig) -> Result<Self, VolleyError> {
        let transport = Self::new(
            config.url.clone(),
            Duration::from_secs(config.connect_timeout_secs),
        )?
        .with_env_fallbacks(config.env_fallbacks.clone());

        info!(url = %config.url, "completion transport initialized");
        Ok(transport)
    }

    /// Replaces the environment variables consulted when a request carries
    /// no credential.
    pub fn with_env_fallbacks(mut self, names: Vec<String>) -> Self {
        self.env_fallbacks = names;
        self
    }

    pub fn url(&self) -> &str {
        self.client.url()
    }

    /// Resolves the credential for one request.
    ///
    /// Empty strings are treated as absent at every step.
    pub fn resolve_credential(&self, explicit: Option<&str>) -> Result<SecretString, VolleyError> {
        if let Some(key) = explicit
            && !key.is_empty()
        {
            return Ok(SecretString::from(key.to_string()));
        }

        self.env_fallbacks
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.is_empty())
            .map(SecretString::from)
            .ok_or(VolleyError::MissingCredential)
    }

    /// Checks a credential with a one-token, non-streaming request.
    ///
    /// Only the given credential is tried; environment fallbacks are not.
    pub async fn verify_connection(&self, credential: Option<&str>, model: &str) -> Verification {
        let Some(key) = credential.filter(|k| !k.is_empty()) else {
            return Verification::failed("No API Key provided");
        };

        let body = ChatCompletionRequest::probe(model);
        match self
            .client
            .probe(&body, &SecretString::from(key.to_string()))
            .await
        {
            Ok(()) => Verification {
                success: true,
                message: "Connected successfully".to_string(),
            },
            Err(e) => Verification::failed(e.to_string()),
        }
    }
}

/// Feeds frames to `on_delta` until the body ends or `cancel` fires.
///
/// Cancellation wins over a frame that is ready at the same time, so no
/// increment is delivered after the token is observed.
pub async fn drain_frames(
    mut frames: FrameStream,
    cancel: &CancellationToken,
    on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> Result<StreamOutcome, VolleyError> {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            next = frames.next() => next,
        };

        match next {
            None => return Ok(StreamOutcome::Finished),
            Some(Ok(SseFrame::Delta(text))) => on_delta(&text),
            // Keep reading: the server closes the body after the sentinel.
            Some(Ok(SseFrame::Done)) => trace!("received [DONE] sentinel"),
            Some(Err(e)) => return Err(e),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiTransport {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, VolleyError> {
        // Probing the endpoint would spend tokens; report constructability only.
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CompletionTransport for OpenAiTransport {
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamOutcome, VolleyError> {
        if cancel.is_cancelled() {
            return Ok(StreamOutcome::Cancelled);
        }

        let credential = self.resolve_credential(request.credential.as_deref())?;
        let body = ChatCompletionRequest::streaming(request);
        debug!(slot = request.slot_index, model = %body.model, "opening completion stream");

        let frames = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(slot = request.slot_index, "cancelled while connecting");
                return Ok(StreamOutcome::Cancelled);
            }
            result = self.client.open_stream(&body, &credential) => result?,
        };

        drain_frames(frames, cancel, on_delta).await
    }
}
