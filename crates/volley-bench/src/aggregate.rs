// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered, observable view over a batch's slots.
//!
//! Each slot sits behind its own lock and has a single writer (its runner),
//! so writers never contend with each other. Readers clone. Every effective
//! mutation bumps a revision counter published on a `watch` channel.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use volley_core::{GenerationSlot, SlotStatus};

pub struct ResultAggregate {
    slots: Vec<Mutex<GenerationSlot>>,
    revision: watch::Sender<u64>,
}

impl ResultAggregate {
    /// Allocates `count` Pending slots indexed `0..count`.
    pub fn new(count: usize) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            slots: (0..count)
                .map(|index| Mutex::new(GenerationSlot::pending(index)))
                .collect(),
            revision,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Clones every slot in index order.
    pub fn snapshot(&self) -> Vec<GenerationSlot> {
        self.slots
            .iter()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    pub fn slot(&self, index: usize) -> Option<GenerationSlot> {
        self.slots
            .get(index)
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Receiver that observes the revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn all_terminal(&self) -> bool {
        self.slots.iter().all(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .status
                .is_terminal()
        })
    }

    pub fn append(&self, index: usize, text: &str) -> bool {
        self.mutate(index, |slot| slot.append(text))
    }

    pub fn complete(&self, index: usize, duration_ms: Option<u64>) -> bool {
        self.mutate(index, |slot| slot.complete(duration_ms))
    }

    pub fn fail(&self, index: usize, message: impl Into<String>, duration_ms: Option<u64>) -> bool {
        self.mutate(index, |slot| slot.fail(message, duration_ms))
    }

    /// Coerces every Pending/Streaming slot to Completed; returns how many
    /// slots changed.
    pub fn finalize_residual(&self) -> usize {
        (0..self.slots.len())
            .filter(|&index| self.mutate(index, GenerationSlot::finalize))
            .count()
    }

    /// Counts slots per status, for logging.
    pub fn status_counts(&self) -> [(SlotStatus, usize); 4] {
        let snapshot = self.snapshot();
        [
            SlotStatus::Pending,
            SlotStatus::Streaming,
            SlotStatus::Completed,
            SlotStatus::Errored,
        ]
        .map(|status| (status, snapshot.iter().filter(|s| s.status == status).count()))
    }

    fn mutate(&self, index: usize, edit: impl FnOnce(&mut GenerationSlot) -> bool) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let changed = edit(&mut slot.lock().unwrap_or_else(PoisonError::into_inner));
        if changed {
            self.revision.send_modify(|revision| *revision += 1);
        }
        changed
    }
}
