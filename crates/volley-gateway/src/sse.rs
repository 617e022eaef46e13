// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events for `GET /api/runs/current/events`.
//!
//! Event format:
//! ```text
//! event: snapshot
//! data: {"id": "...", "slots": [...]}
//!
//! event: done
//! data: {"id": "...", "slots": [...], "committed": true}
//! ```
//!
//! A `snapshot` is sent on connect and after every slot change; `done` is
//! sent once the batch is finalized and ends the stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream, StreamExt};
use volley_bench::{Batch, Finalized};

use crate::handlers::ErrorResponse;
use crate::server::GatewayState;

pub async fn stream_current_run(State(state): State<GatewayState>) -> Response {
    match state.orchestrator.current() {
        Some(batch) => Sse::new(run_events(batch))
            .keep_alive(KeepAlive::default())
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no run in progress".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Snapshot stream for one batch, ending after its `done` event.
pub fn run_events(batch: Arc<Batch>) -> impl Stream<Item = Result<Event, Infallible>> {
    let revisions = batch.aggregate().subscribe();
    let first = snapshot_event(&batch);
    stream::once(async move { Ok(first) }).chain(stream::unfold(
        Some((batch, revisions)),
        |state| async move {
            let (batch, mut revisions) = state?;
            tokio::select! {
                biased;
                finalized = batch.finalized() => Some((Ok(done_event(&batch, finalized)), None)),
                changed = revisions.changed() => match changed {
                    Ok(()) => {
                        let event = snapshot_event(&batch);
                        Some((Ok(event), Some((batch, revisions))))
                    }
                    Err(_) => Some((Ok(done_event(&batch, None)), None)),
                },
            }
        },
    ))
}

fn snapshot_event(batch: &Batch) -> Event {
    let payload = serde_json::json!({
        "id": batch.id(),
        "slots": batch.aggregate().snapshot(),
    });
    Event::default().event("snapshot").data(payload.to_string())
}

fn done_event(batch: &Batch, finalized: Option<Finalized>) -> Event {
    let (slots, committed) = match finalized {
        Some(Finalized { slots, record }) => (slots, record.is_some()),
        None => (batch.aggregate().snapshot(), false),
    };
    let payload = serde_json::json!({
        "id": batch.id(),
        "slots": slots,
        "committed": committed,
    });
    Event::default().event("done").data(payload.to_string())
}
