// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Volley workspace.
//!
//! Cancellation is not an error: an aborted stream is reported as
//! [`StreamOutcome::Cancelled`](crate::traits::StreamOutcome), never as an error.

use thiserror::Error;

/// The primary error type shared by the adapter traits and the orchestrator.
#[derive(Debug, Error)]
pub enum VolleyError {
    /// No usable credential could be resolved at request time.
    #[error("Missing API Key. Please configure it in settings.")]
    MissingCredential,

    /// Non-success HTTP status or an unrecoverable response body.
    ///
    /// Displays as the bare message so it can be shown verbatim in a slot.
    #[error("{message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid values, unusable endpoint settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VolleyError {
    /// Shorthand for a [`VolleyError::Transport`] without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        VolleyError::Transport {
            message: message.into(),
            source: None,
        }
    }
}
