// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE frame decoder for streaming chat-completion responses.
//!
//! Every newline-terminated line is its own frame; blank lines are not
//! needed to dispatch. Only `data:` lines carry payloads, and a payload that
//! fails to parse is dropped so keep-alives and vendor extensions never
//! break a stream.

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tracing::trace;
use volley_core::VolleyError;

use crate::types::StreamChunk;

/// Sentinel payload that marks the logical end of a stream.
const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

/// A meaningful frame from the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A non-empty content increment.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, VolleyError>> + Send>>;

/// Decodes a reqwest streaming response into [`SseFrame`]s.
pub fn parse_sse_stream(response: reqwest::Response) -> FrameStream {
    decode_frames(response.bytes_stream())
}

/// Decodes any byte-chunk stream into [`SseFrame`]s.
///
/// Lines may be split across chunks arbitrarily; a trailing line without a
/// newline is decoded when the body ends. A read error on the underlying
/// stream surfaces as [`VolleyError::Transport`].
pub fn decode_frames<S, B, E>(bytes: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Into<Bytes> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let reader = StreamReader::new(bytes.map(|chunk| {
        chunk
            .map(Into::into)
            .map_err(|e| io::Error::other(e.to_string()))
    }));

    let frames = FramedRead::new(reader, LinesCodec::new()).filter_map(|line| async move {
        match line {
            Ok(line) => decode_line(&line).map(Ok),
            Err(e) => Some(Err(VolleyError::transport(format!(
                "stream read failed: {e}"
            )))),
        }
    });

    Box::pin(frames)
}

fn decode_line(line: &str) -> Option<SseFrame> {
    let payload = line.trim().strip_prefix(DATA_PREFIX)?;
    decode_data(payload)
}

fn decode_data(data: &str) -> Option<SseFrame> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    if data == DONE_SENTINEL {
        return Some(SseFrame::Done);
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk.into_content().map(SseFrame::Delta),
        Err(e) => {
            trace!(error = %e, "dropping unparseable frame");
            None
        }
    }
}
