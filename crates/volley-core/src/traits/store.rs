// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for prompts, history and settings.
//!
//! Mutating calls return the refreshed list so callers can redraw without a
//! second round trip.

use async_trait::async_trait;

use crate::error::VolleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{HistoryRecord, PromptKind, SavedPrompt};

/// Maximum number of history records returned by [`HistoryStore::list_history`].
pub const HISTORY_LIST_LIMIT: usize = 50;

#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Lists prompts of one kind, newest first.
    async fn list_prompts(&self, kind: PromptKind) -> Result<Vec<SavedPrompt>, VolleyError>;

    /// Inserts or replaces a prompt keyed by its id.
    async fn save_prompt(&self, prompt: &SavedPrompt) -> Result<Vec<SavedPrompt>, VolleyError>;

    async fn delete_prompt(
        &self,
        kind: PromptKind,
        id: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError>;

    async fn rename_prompt(
        &self,
        kind: PromptKind,
        id: &str,
        title: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError>;

    async fn toggle_prompt_favorite(
        &self,
        kind: PromptKind,
        id: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Lists the most recent records, newest first, capped at
    /// [`HISTORY_LIST_LIMIT`].
    async fn list_history(&self) -> Result<Vec<HistoryRecord>, VolleyError>;

    async fn get_history(&self, id: &str) -> Result<Option<HistoryRecord>, VolleyError>;

    /// Inserts a record. An existing record with the same id is left untouched.
    async fn insert_history(&self, record: &HistoryRecord)
    -> Result<Vec<HistoryRecord>, VolleyError>;

    async fn delete_history(&self, id: &str) -> Result<Vec<HistoryRecord>, VolleyError>;

    async fn toggle_history_favorite(&self, id: &str) -> Result<Vec<HistoryRecord>, VolleyError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored API key, or `None` when unset or empty.
    async fn get_api_key(&self) -> Result<Option<String>, VolleyError>;

    async fn set_api_key(&self, key: &str) -> Result<(), VolleyError>;
}

/// A complete storage backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter + PromptStore + HistoryStore + SettingsStore {
    /// Prepares the backend (migrations, schema checks).
    async fn initialize(&self) -> Result<(), VolleyError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), VolleyError>;
}
