// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat-completion endpoints.
//!
//! Only the TCP connect phase is timed out. A streamed body may legitimately
//! run for minutes and is bounded by cancellation instead.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use volley_core::VolleyError;

use crate::sse::{self, FrameStream};
use crate::types::ChatCompletionRequest;

/// Bodies shorter than this are appended verbatim to non-JSON error messages.
const RAW_ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
}

impl CompletionClient {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, VolleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| VolleyError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(
        &self,
        body: &ChatCompletionRequest,
        credential: &SecretString,
    ) -> Result<reqwest::Response, VolleyError> {
        self.client
            .post(&self.url)
            .bearer_auth(credential.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| VolleyError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })
    }

    /// Sends a streaming request and returns its decoded frames.
    pub async fn open_stream(
        &self,
        body: &ChatCompletionRequest,
        credential: &SecretString,
    ) -> Result<FrameStream, VolleyError> {
        let response = self.send(body, credential).await?;
        let status = response.status();
        debug!(status = %status, model = %body.model, "streaming response received");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VolleyError::transport(stream_error_message(
                status.as_u16(),
                &text,
            )));
        }

        Ok(sse::parse_sse_stream(response))
    }

    /// Sends a non-streaming probe and discards the body on success.
    pub async fn probe(
        &self,
        body: &ChatCompletionRequest,
        credential: &SecretString,
    ) -> Result<(), VolleyError> {
        let response = self.send(body, credential).await?;
        let status = response.status();
        debug!(status = %status, "probe response received");

        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(VolleyError::transport(probe_error_message(
            status.as_u16(),
            &text,
        )))
    }
}

/// Message for a failed streaming request: `error.message`, then `message`,
/// then `API Error <status>`. A short non-JSON body is appended verbatim.
pub fn stream_error_message(status: u16, body: &str) -> String {
    let fallback = format!("API Error {status}");
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => nested_message(&json)
            .or_else(|| string_field(&json, "message"))
            .unwrap_or(fallback),
        Err(_) if body.len() < RAW_ERROR_BODY_LIMIT => format!("{fallback}: {body}"),
        Err(_) => fallback,
    }
}

/// Message for a failed probe: `error.message`, then `message`, then
/// `code`, then `HTTP <status>`.
pub fn probe_error_message(status: u16, body: &str) -> String {
    let fallback = format!("HTTP {status}");
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback;
    };
    nested_message(&json)
        .or_else(|| string_field(&json, "message"))
        .or_else(|| match json.get("code") {
            Some(serde_json::Value::String(code)) if !code.is_empty() => Some(code.clone()),
            Some(serde_json::Value::Number(code)) => Some(code.to_string()),
            _ => None,
        })
        .unwrap_or(fallback)
}

fn nested_message(json: &serde_json::Value) -> Option<String> {
    json.get("error").and_then(|e| string_field(e, "message"))
}

fn string_field(json: &serde_json::Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
