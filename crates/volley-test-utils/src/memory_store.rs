// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter with call counters and failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use volley_core::{
    AdapterType, HISTORY_LIST_LIMIT, HealthStatus, HistoryRecord, HistoryStore, PluginAdapter,
    PromptKind, PromptStore, SavedPrompt, SettingsStore, StorageAdapter, VolleyError,
};

/// Mirrors the SQLite adapter's semantics over plain vectors.
#[derive(Default)]
pub struct MemoryStore {
    prompts: Mutex<Vec<SavedPrompt>>,
    history: Mutex<Vec<HistoryRecord>>,
    api_key: Mutex<Option<String>>,
    insert_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_lookups: AtomicBool,
    insert_delay: Mutex<Duration>,
}

fn injected(operation: &str) -> VolleyError {
    VolleyError::Storage {
        source: format!("injected {operation} failure").into(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `insert_history` call fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes every `get_history` call fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Delays each insert, widening race windows in concurrency tests.
    pub async fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock().await = delay;
    }

    /// Number of `insert_history` calls, including failed ones.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Every stored record, newest first, without the list cap.
    pub async fn all_history(&self) -> Vec<HistoryRecord> {
        let mut records = self.history.lock().await.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    async fn prompts_of(&self, kind: PromptKind) -> Vec<SavedPrompt> {
        let mut prompts: Vec<SavedPrompt> = self
            .prompts
            .lock()
            .await
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect();
        prompts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        prompts
    }

    async fn with_prompt(&self, kind: PromptKind, id: &str, edit: impl FnOnce(&mut SavedPrompt)) {
        if let Some(prompt) = self
            .prompts
            .lock()
            .await
            .iter_mut()
            .find(|p| p.kind == kind && p.id == id)
        {
            edit(prompt);
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, VolleyError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    async fn initialize(&self) -> Result<(), VolleyError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), VolleyError> {
        Ok(())
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn list_prompts(&self, kind: PromptKind) -> Result<Vec<SavedPrompt>, VolleyError> {
        Ok(self.prompts_of(kind).await)
    }

    async fn save_prompt(&self, prompt: &SavedPrompt) -> Result<Vec<SavedPrompt>, VolleyError> {
        {
            let mut prompts = self.prompts.lock().await;
            match prompts
                .iter_mut()
                .find(|p| p.kind == prompt.kind && p.id == prompt.id)
            {
                Some(existing) => {
                    existing.title = prompt.title.clone();
                    existing.content = prompt.content.clone();
                    existing.is_favorite = prompt.is_favorite;
                }
                None => prompts.push(prompt.clone()),
            }
        }
        Ok(self.prompts_of(prompt.kind).await)
    }

    async fn delete_prompt(
        &self,
        kind: PromptKind,
        id: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError> {
        self.prompts
            .lock()
            .await
            .retain(|p| !(p.kind == kind && p.id == id));
        Ok(self.prompts_of(kind).await)
    }

    async fn rename_prompt(
        &self,
        kind: PromptKind,
        id: &str,
        title: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError> {
        self.with_prompt(kind, id, |p| p.title = title.to_string()).await;
        Ok(self.prompts_of(kind).await)
    }

    async fn toggle_prompt_favorite(
        &self,
        kind: PromptKind,
        id: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError> {
        self.with_prompt(kind, id, |p| p.is_favorite = !p.is_favorite).await;
        Ok(self.prompts_of(kind).await)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn list_history(&self) -> Result<Vec<HistoryRecord>, VolleyError> {
        let mut records = self.all_history().await;
        records.truncate(HISTORY_LIST_LIMIT);
        Ok(records)
    }

    async fn get_history(&self, id: &str) -> Result<Option<HistoryRecord>, VolleyError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(injected("lookup"));
        }
        Ok(self
            .history
            .lock()
            .await
            .iter()
            .find(|r| r.id.as_str() == id)
            .cloned())
    }

    async fn insert_history(
        &self,
        record: &HistoryRecord,
    ) -> Result<Vec<HistoryRecord>, VolleyError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.insert_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected("insert"));
        }
        {
            let mut history = self.history.lock().await;
            if !history.iter().any(|r| r.id == record.id) {
                history.push(record.clone());
            }
        }
        self.list_history().await
    }

    async fn delete_history(&self, id: &str) -> Result<Vec<HistoryRecord>, VolleyError> {
        self.history.lock().await.retain(|r| r.id.as_str() != id);
        self.list_history().await
    }

    async fn toggle_history_favorite(&self, id: &str) -> Result<Vec<HistoryRecord>, VolleyError> {
        if let Some(record) = self
            .history
            .lock()
            .await
            .iter_mut()
            .find(|r| r.id.as_str() == id)
        {
            record.is_favorite = !record.is_favorite;
        }
        self.list_history().await
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_api_key(&self) -> Result<Option<String>, VolleyError> {
        Ok(self.api_key.lock().await.clone().filter(|k| !k.is_empty()))
    }

    async fn set_api_key(&self, key: &str) -> Result<(), VolleyError> {
        *self.api_key.lock().await = Some(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::{BatchId, GenerationConfig};

    fn record(id: &str) -> HistoryRecord {
        HistoryRecord::from_slots(BatchId(id.into()), "s", "u", &GenerationConfig::default(), &[])
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_id() {
        let store = MemoryStore::new();
        store.insert_history(&record("a")).await.unwrap();
        let list = store.insert_history(&record("a")).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(store.insert_calls(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_storage_errors() {
        let store = MemoryStore::new();
        store.fail_inserts(true);
        store.fail_lookups(true);
        assert!(matches!(
            store.insert_history(&record("a")).await,
            Err(VolleyError::Storage { .. })
        ));
        assert!(store.get_history("a").await.is_err());
        assert!(store.all_history().await.is_empty());
    }

    #[tokio::test]
    async fn prompt_upsert_keeps_created_at() {
        let store = MemoryStore::new();
        let mut prompt = SavedPrompt::new(PromptKind::User, "t", "c");
        let created = prompt.created_at;
        store.save_prompt(&prompt).await.unwrap();
        prompt.title = "t2".into();
        prompt.created_at = created + 1000;
        let list = store.save_prompt(&prompt).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "t2");
        assert_eq!(list[0].created_at, created);
    }
}
