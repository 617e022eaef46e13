// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use volley_config::model::StorageConfig;
use volley_core::{
    AdapterType, HealthStatus, HistoryRecord, HistoryStore, PluginAdapter, PromptKind,
    PromptStore, SavedPrompt, SettingsStore, StorageAdapter, VolleyError,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other call
/// fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens and initializes storage in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, VolleyError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, VolleyError> {
        self.db.get().ok_or_else(|| VolleyError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, VolleyError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), VolleyError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VolleyError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), VolleyError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PromptStore for SqliteStorage {
    async fn list_prompts(&self, kind: PromptKind) -> Result<Vec<SavedPrompt>, VolleyError> {
        queries::prompts::list_prompts(self.db()?, kind).await
    }

    async fn save_prompt(&self, prompt: &SavedPrompt) -> Result<Vec<SavedPrompt>, VolleyError> {
        queries::prompts::save_prompt(self.db()?, prompt).await
    }

    async fn delete_prompt(
        &self,
        kind: PromptKind,
        id: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError> {
        queries::prompts::delete_prompt(self.db()?, kind, id).await
    }

    async fn rename_prompt(
        &self,
        kind: PromptKind,
        id: &str,
        title: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError> {
        queries::prompts::rename_prompt(self.db()?, kind, id, title).await
    }

    async fn toggle_prompt_favorite(
        &self,
        kind: PromptKind,
        id: &str,
    ) -> Result<Vec<SavedPrompt>, VolleyError> {
        queries::prompts::toggle_prompt_favorite(self.db()?, kind, id).await
    }
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn list_history(&self) -> Result<Vec<HistoryRecord>, VolleyError> {
        queries::history::list_history(self.db()?).await
    }

    async fn get_history(&self, id: &str) -> Result<Option<HistoryRecord>, VolleyError> {
        queries::history::get_history(self.db()?, id).await
    }

    async fn insert_history(
        &self,
        record: &HistoryRecord,
    ) -> Result<Vec<HistoryRecord>, VolleyError> {
        queries::history::insert_history(self.db()?, record).await
    }

    async fn delete_history(&self, id: &str) -> Result<Vec<HistoryRecord>, VolleyError> {
        queries::history::delete_history(self.db()?, id).await
    }

    async fn toggle_history_favorite(&self, id: &str) -> Result<Vec<HistoryRecord>, VolleyError> {
        queries::history::toggle_history_favorite(self.db()?, id).await
    }
}

#[async_trait]
impl SettingsStore for SqliteStorage {
    async fn get_api_key(&self) -> Result<Option<String>, VolleyError> {
        let value = queries::settings::get_setting(self.db()?, queries::settings::API_KEY).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    async fn set_api_key(&self, key: &str) -> Result<(), VolleyError> {
        queries::settings::set_setting(self.db()?, queries::settings::API_KEY, key).await
    }
}
