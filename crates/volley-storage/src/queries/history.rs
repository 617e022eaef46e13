// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run history operations. `config` and `results` are stored as JSON text.

use rusqlite::types::Type;
use rusqlite::{Row, params};
use volley_core::{BatchId, HISTORY_LIST_LIMIT, HistoryRecord, VolleyError};

use crate::database::{Database, map_tr_err};

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, system_prompt, user_prompt, config, results, is_favorite FROM history";

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: BatchId(row.get(0)?),
        timestamp: row.get(1)?,
        system_prompt: row.get(2)?,
        user_prompt: row.get(3)?,
        config: json_column(row, 4)?,
        results: json_column(row, 5)?,
        is_favorite: row.get(6)?,
    })
}

/// Most recent records, newest first.
pub async fn list_history(db: &Database) -> Result<Vec<HistoryRecord>, VolleyError> {
    db.connection()
        .call(|conn| -> Result<Vec<HistoryRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} ORDER BY timestamp DESC, rowid DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![HISTORY_LIST_LIMIT as i64], record_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_history(db: &Database, id: &str) -> Result<Option<HistoryRecord>, VolleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<HistoryRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            match stmt.query_row(params![id], record_from_row) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a record unless one with the same id already exists.
pub async fn insert_history(
    db: &Database,
    record: &HistoryRecord,
) -> Result<Vec<HistoryRecord>, VolleyError> {
    let config = serde_json::to_string(&record.config).map_err(|e| VolleyError::Storage {
        source: Box::new(e),
    })?;
    let results = serde_json::to_string(&record.results).map_err(|e| VolleyError::Storage {
        source: Box::new(e),
    })?;
    let record = record.clone();

    let inserted = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "INSERT INTO history
                     (id, timestamp, system_prompt, user_prompt, config, results, is_favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (id) DO NOTHING",
                params![
                    record.id.as_str(),
                    record.timestamp,
                    record.system_prompt,
                    record.user_prompt,
                    config,
                    results,
                    record.is_favorite,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if inserted == 0 {
        tracing::debug!("history record already present, insert skipped");
    }
    list_history(db).await
}

pub async fn delete_history(db: &Database, id: &str) -> Result<Vec<HistoryRecord>, VolleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM history WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    list_history(db).await
}

pub async fn toggle_history_favorite(
    db: &Database,
    id: &str,
) -> Result<Vec<HistoryRecord>, VolleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE history SET is_favorite = 1 - is_favorite WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    list_history(db).await
}
