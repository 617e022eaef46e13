// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for `run` and `serve`.
//!
//! SIGINT (Ctrl+C) and SIGTERM cancel a [`CancellationToken`]; `run` turns
//! that into a batch abort, `serve` into a graceful gateway shutdown.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Returns a token cancelled on the first SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            let which = next_signal().await;
            info!(signal = which, "stopping");
            token.cancel();
            debug!("signal listener exiting");
        }
    });
    token
}

#[cfg(unix)]
async fn next_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "SIGTERM unavailable, listening for Ctrl+C only");
            None
        }
    };
    let terminate = async {
        match sigterm.as_mut() {
            Some(stream) => stream.recv().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn next_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C listener failed");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
