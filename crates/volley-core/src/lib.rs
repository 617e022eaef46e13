// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Volley prompt workbench.
//!
//! This crate provides the error type, the data model shared by every other
//! crate, and the adapter traits that transports and stores implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::VolleyError;
pub use types::{
    AdapterType, BatchId, ChatMessage, CompletionRequest, GenerationConfig, GenerationSlot,
    HealthStatus, HistoryRecord, MAX_OUTPUT_COUNT, PromptKind, Role, SavedPrompt, SlotResult,
    SlotStatus, TerminalStatus, ThinkingMode, prompts_are_empty,
};

pub use traits::{
    CompletionTransport, HISTORY_LIST_LIMIT, HistoryStore, PluginAdapter, PromptStore,
    SettingsStore, StorageAdapter, StreamOutcome,
};
