// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent streaming batch orchestrator.
//!
//! A batch fans one prompt pair out into N slots. Each slot is driven by a
//! [`SlotRunner`] on its own task and streams into the shared
//! [`ResultAggregate`]. When every slot settles, or the batch is aborted, the
//! [`BatchOrchestrator`] finalizes exactly once behind a
//! [`FinalizationLatch`] and hands the batch to the [`HistoryCommitter`].

pub mod aggregate;
pub mod batch;
pub mod commit;
pub mod latch;
pub mod orchestrator;
pub mod slot;

pub use aggregate::ResultAggregate;
pub use batch::{Batch, Finalized};
pub use commit::HistoryCommitter;
pub use latch::FinalizationLatch;
pub use orchestrator::{
    BatchHandle, BatchOrchestrator, BatchReport, BatchRequest, OrchestratorSettings, Phase,
    StartRejected,
};
pub use slot::{SlotResolution, SlotRunner};
