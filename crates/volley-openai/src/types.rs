// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the chat-completions API.

use serde::{Deserialize, Serialize};
use volley_core::{ChatMessage, CompletionRequest, ThinkingMode};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Volcengine extension; other providers ignore it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThinkingParam {
    #[serde(rename = "type")]
    pub kind: ThinkingMode,
}

impl ChatCompletionRequest {
    /// Streaming body carrying every generation parameter.
    pub fn streaming(request: &CompletionRequest) -> Self {
        let config = &request.config;
        Self {
            model: config.model.clone(),
            messages: request.messages.clone(),
            stream: true,
            temperature: Some(config.temperature),
            frequency_penalty: Some(config.frequency_penalty),
            presence_penalty: Some(config.presence_penalty),
            thinking: Some(ThinkingParam {
                kind: config.thinking,
            }),
            max_tokens: None,
        }
    }

    /// Minimal one-token probe used to check a credential.
    pub fn probe(model: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::user("test")],
            stream: false,
            temperature: None,
            frequency_penalty: None,
            presence_penalty: None,
            thinking: None,
            max_tokens: Some(1),
        }
    }
}

/// One `data:` payload of a streaming response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// Returns the first choice's non-empty content increment.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::GenerationConfig;

    #[test]
    fn streaming_body_carries_parameters() {
        let request = CompletionRequest::for_prompts(
            "be brief",
            "hello",
            GenerationConfig::default(),
            None,
        );
        let json = serde_json::to_value(ChatCompletionRequest::streaming(&request)).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["model"], "doubao-seed-1-6-251015");
        assert_eq!(json["thinking"]["type"], "enabled");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn probe_body_is_minimal() {
        let json = serde_json::to_value(ChatCompletionRequest::probe("m")).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 1);
        assert_eq!(json["messages"][0]["content"], "test");
        assert!(json.get("temperature").is_none());
        assert!(json.get("thinking").is_none());
    }

    #[test]
    fn chunk_content_extraction() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.into_content().as_deref(), Some("Hi"));

        let role_only: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(role_only.into_content(), None);

        let empty: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(empty.into_content(), None);

        let no_choices: StreamChunk = serde_json::from_str(r#"{"usage":{}}"#).unwrap();
        assert_eq!(no_choices.into_content(), None);
    }
}
