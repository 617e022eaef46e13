// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transport, orchestrator, storage and gateway.
//!
//! Serde field names follow the JSON shapes the workbench front end already
//! speaks (`outputCount`, `systemPrompt`, `isFavorite`, `thinking: {type}`).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Upper bound on the fan-out width of a single batch.
pub const MAX_OUTPUT_COUNT: usize = 20;

/// Unique identifier for a batch and the history record it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Mints a fresh identifier (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
}

// --- Chat messages ---

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Returns true when neither prompt carries any non-whitespace text.
pub fn prompts_are_empty(system_prompt: &str, user_prompt: &str) -> bool {
    system_prompt.trim().is_empty() && user_prompt.trim().is_empty()
}

// --- Generation configuration ---

/// Whether the model is asked to emit reasoning before answering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingMode {
    Enabled,
    Disabled,
}

/// Generation parameters for one batch.
///
/// A batch clones its snapshot at start, so later edits never leak into a
/// running batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier passed through to the endpoint.
    pub model: String,
    /// Sampling temperature, 0 to 2.
    pub temperature: f64,
    /// Frequency penalty, -2 to 2.
    pub frequency_penalty: f64,
    /// Presence penalty, -2 to 2.
    pub presence_penalty: f64,
    /// Serialized as `{"type": "enabled" | "disabled"}`.
    #[serde(with = "thinking_object")]
    pub thinking: ThinkingMode,
    /// Fan-out width, 1 to [`MAX_OUTPUT_COUNT`].
    #[serde(rename = "outputCount")]
    pub output_count: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "doubao-seed-1-6-251015".to_string(),
            temperature: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            thinking: ThinkingMode::Enabled,
            output_count: 4,
        }
    }
}

impl GenerationConfig {
    /// Lists every out-of-range value, in field order.
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.model.trim().is_empty() {
            problems.push("model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            problems.push(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            ));
        }
        if !(-2.0..=2.0).contains(&self.frequency_penalty) {
            problems.push(format!(
                "frequency_penalty must be between -2 and 2, got {}",
                self.frequency_penalty
            ));
        }
        if !(-2.0..=2.0).contains(&self.presence_penalty) {
            problems.push(format!(
                "presence_penalty must be between -2 and 2, got {}",
                self.presence_penalty
            ));
        }
        if !(1..=MAX_OUTPUT_COUNT).contains(&self.output_count) {
            problems.push(format!(
                "output_count must be between 1 and {MAX_OUTPUT_COUNT}, got {}",
                self.output_count
            ));
        }

        problems
    }

    /// Validates ranges, reporting all violations in one message.
    pub fn validate(&self) -> Result<(), crate::VolleyError> {
        let problems = self.violations();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(crate::VolleyError::Config(problems.join("; ")))
        }
    }
}

mod thinking_object {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ThinkingMode;

    #[derive(Serialize, Deserialize)]
    struct Wire {
        #[serde(rename = "type")]
        kind: ThinkingMode,
    }

    pub fn serialize<S: Serializer>(mode: &ThinkingMode, serializer: S) -> Result<S::Ok, S::Error> {
        Wire { kind: *mode }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ThinkingMode, D::Error> {
        Ok(Wire::deserialize(deserializer)?.kind)
    }
}

// --- Slots ---

/// Lifecycle status of one generation slot.
///
/// Pending and Streaming are transient; Completed and Errored are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum SlotStatus {
    #[serde(rename = "loading")]
    Pending,
    #[serde(rename = "streaming")]
    Streaming,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "error")]
    Errored,
}

impl SlotStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotStatus::Completed | SlotStatus::Errored)
    }
}

/// One parallel output position within a batch.
///
/// Every mutator is a no-op once the slot is terminal, which keeps a slot
/// immutable after it completes, errors, or is finalized on abort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSlot {
    #[serde(rename = "id")]
    pub slot_index: usize,
    pub content: String,
    pub status: SlotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl GenerationSlot {
    pub fn pending(slot_index: usize) -> Self {
        Self {
            slot_index,
            content: String::new(),
            status: SlotStatus::Pending,
            error: None,
            duration_ms: None,
        }
    }

    /// Appends an increment and (re-)enters Streaming.
    pub fn append(&mut self, text: &str) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.content.push_str(text);
        self.status = SlotStatus::Streaming;
        true
    }

    pub fn complete(&mut self, duration_ms: Option<u64>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SlotStatus::Completed;
        self.duration_ms = duration_ms;
        true
    }

    pub fn fail(&mut self, message: impl Into<String>, duration_ms: Option<u64>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SlotStatus::Errored;
        self.error = Some(message.into());
        self.duration_ms = duration_ms;
        true
    }

    /// Coerces a residual Pending/Streaming slot to Completed.
    ///
    /// Returns whether the slot was coerced.
    pub fn finalize(&mut self) -> bool {
        self.complete(self.duration_ms)
    }
}

/// The closed set of statuses a persisted slot may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum TerminalStatus {
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "error")]
    Errored,
}

/// A slot as it is written to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotResult {
    #[serde(rename = "id")]
    pub slot_index: usize,
    pub content: String,
    pub status: TerminalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl From<&GenerationSlot> for SlotResult {
    /// Anything that is not Errored is recorded as Completed, including a
    /// slot that never received a token.
    fn from(slot: &GenerationSlot) -> Self {
        let status = match slot.status {
            SlotStatus::Errored => TerminalStatus::Errored,
            SlotStatus::Pending | SlotStatus::Streaming | SlotStatus::Completed => {
                TerminalStatus::Completed
            }
        };
        Self {
            slot_index: slot.slot_index,
            content: slot.content.clone(),
            status,
            error: slot.error.clone(),
            duration_ms: slot.duration_ms,
        }
    }
}

// --- Persisted records ---

/// Immutable summary of one finished or aborted batch.
///
/// Only `is_favorite` may change after the record is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: BatchId,
    /// Creation time in unix milliseconds.
    pub timestamp: i64,
    pub system_prompt: String,
    pub user_prompt: String,
    pub config: GenerationConfig,
    pub results: Vec<SlotResult>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl HistoryRecord {
    /// Builds a record stamped with the current time.
    pub fn from_slots(
        id: BatchId,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
        slots: &[GenerationSlot],
    ) -> Self {
        Self {
            id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            config: config.clone(),
            results: slots.iter().map(SlotResult::from).collect(),
            is_favorite: false,
        }
    }
}

/// Which prompt editor a saved prompt belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptKind {
    System,
    User,
}

/// A reusable prompt saved by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPrompt {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    /// Creation time in unix milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub is_favorite: bool,
}

impl SavedPrompt {
    pub fn new(kind: PromptKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            kind,
            created_at: chrono::Utc::now().timestamp_millis(),
            is_favorite: false,
        }
    }
}

// --- Transport request ---

/// Everything one slot needs to issue its streaming request.
#[derive(Clone)]
pub struct CompletionRequest {
    /// Position of the issuing slot, carried for diagnostics.
    pub slot_index: usize,
    pub messages: Vec<ChatMessage>,
    pub config: GenerationConfig,
    /// Explicit credential; the transport falls back to the environment.
    pub credential: Option<String>,
}

impl CompletionRequest {
    /// Builds the `[system, user]` message pair used by every batch.
    pub fn for_prompts(
        system_prompt: &str,
        user_prompt: &str,
        config: GenerationConfig,
        credential: Option<String>,
    ) -> Self {
        Self {
            slot_index: 0,
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            config,
            credential,
        }
    }

    /// Returns a copy addressed from the given slot.
    pub fn for_slot(&self, slot_index: usize) -> Self {
        Self {
            slot_index,
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("slot_index", &self.slot_index)
            .field("messages", &self.messages)
            .field("config", &self.config)
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
