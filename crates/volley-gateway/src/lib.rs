// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Volley workbench.
//!
//! Serves the prompt library, run history and API-key settings as a JSON
//! API, and lets clients start, observe and abort batches on a shared
//! [`BatchOrchestrator`](volley_bench::BatchOrchestrator).

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{GatewayState, ServerConfig, router, serve, start_server};
