//! The diff-and-transfer sync engine.
//!
//! One run mirrors the source's pinned set onto each configured target:
//! resolve the unsynced work list, transfer each item under a bounded
//! concurrency ceiling with fetch retries and post-transfer address
//! verification, then aggregate per-item outcomes into a per-target result.

mod batch;
mod error;
mod resolve;
mod run;
mod transfer;

pub use batch::run_batch;
pub use error::{Result, SyncError};
pub use resolve::{collect_unsynced, WorkItem};
pub use run::{
    run_sync, RunConfig, RunReport, SyncResult, TargetReport, DEFAULT_CONCURRENCY,
};
pub use transfer::{transfer_object, FailureReason, Outcome, TransferOptions};
