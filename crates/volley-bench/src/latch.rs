// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot latch guarding batch finalization.

use std::sync::atomic::{AtomicBool, Ordering};

/// Fires at most once. The caller that fires it owns finalization.
#[derive(Debug, Default)]
pub struct FinalizationLatch {
    fired: AtomicBool,
}

impl FinalizationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for exactly one caller over the latch's lifetime.
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
