// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saved prompt CRUD operations.
//!
//! Mutations on a missing id are silent no-ops; every mutation returns the
//! refreshed list for its kind.

use rusqlite::params;
use volley_core::{PromptKind, SavedPrompt, VolleyError};

use crate::database::{Database, map_tr_err};

/// List prompts of one kind, newest first.
pub async fn list_prompts(db: &Database, kind: PromptKind) -> Result<Vec<SavedPrompt>, VolleyError> {
    db.connection()
        .call(move |conn| -> Result<Vec<SavedPrompt>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, created_at, is_favorite
                 FROM prompts WHERE kind = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![kind.to_string()], |row| {
                Ok(SavedPrompt {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    kind,
                    created_at: row.get(3)?,
                    is_favorite: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a prompt, or update title, content and favorite of an existing one.
///
/// `created_at` of an existing prompt is preserved.
pub async fn save_prompt(db: &Database, prompt: &SavedPrompt) -> Result<Vec<SavedPrompt>, VolleyError> {
    let prompt = prompt.clone();
    let kind = prompt.kind;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO prompts (kind, id, title, content, created_at, is_favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (kind, id) DO UPDATE SET
                     title = excluded.title,
                     content = excluded.content,
                     is_favorite = excluded.is_favorite",
                params![
                    prompt.kind.to_string(),
                    prompt.id,
                    prompt.title,
                    prompt.content,
                    prompt.created_at,
                    prompt.is_favorite,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    list_prompts(db, kind).await
}

pub async fn delete_prompt(
    db: &Database,
    kind: PromptKind,
    id: &str,
) -> Result<Vec<SavedPrompt>, VolleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM prompts WHERE kind = ?1 AND id = ?2",
                params![kind.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    list_prompts(db, kind).await
}

pub async fn rename_prompt(
    db: &Database,
    kind: PromptKind,
    id: &str,
    title: &str,
) -> Result<Vec<SavedPrompt>, VolleyError> {
    let id = id.to_string();
    let title = title.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE prompts SET title = ?3 WHERE kind = ?1 AND id = ?2",
                params![kind.to_string(), id, title],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    list_prompts(db, kind).await
}

pub async fn toggle_prompt_favorite(
    db: &Database,
    kind: PromptKind,
    id: &str,
) -> Result<Vec<SavedPrompt>, VolleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE prompts SET is_favorite = 1 - is_favorite WHERE kind = ?1 AND id = ?2",
                params![kind.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    list_prompts(db, kind).await
}
