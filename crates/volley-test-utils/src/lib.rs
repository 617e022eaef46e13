// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Volley.
//!
//! [`MockTransport`] streams scripted replies per slot without any network,
//! and [`MemoryStore`] is an in-memory [`StorageAdapter`](volley_core::StorageAdapter)
//! with call counters and failure injection.

pub mod memory_store;
pub mod mock_transport;

pub use memory_store::MemoryStore;
pub use mock_transport::{MockReply, MockTransport};
