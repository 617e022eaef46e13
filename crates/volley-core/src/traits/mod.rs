// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the orchestrator and its backends.
//!
//! Everything here is object safe via `#[async_trait]` so the binary can hold
//! `Arc<dyn CompletionTransport>` and swap in test doubles.

pub mod adapter;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use store::{HISTORY_LIST_LIMIT, HistoryStore, PromptStore, SettingsStore, StorageAdapter};
pub use transport::{CompletionTransport, StreamOutcome};
