//! The sync run orchestrator: one full resolve/schedule/aggregate cycle per
//! target, targets processed strictly in order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::address::ContentAddress;
use crate::client::StoreClient;
use crate::sync::batch::run_batch;
use crate::sync::error::SyncError;
use crate::sync::resolve::collect_unsynced;
use crate::sync::transfer::{transfer_object, Outcome, TransferOptions};

/// Default number of transfers in flight per target.
pub const DEFAULT_CONCURRENCY: usize = 10;

// =============================================================================
// RunConfig
// =============================================================================

/// Configuration for one sync run. Immutable for the run's duration; fans
/// out into one cycle per target endpoint.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Source node endpoint.
    pub source: String,
    /// Target node endpoints, processed in order. Must not be empty.
    pub targets: Vec<String>,
    /// Skip objects whose address is already pinned on the target.
    pub skip_existing: bool,
    /// Candidate addresses overriding the source's pin listing.
    pub file_list: Option<Vec<ContentAddress>>,
    /// Fetch retries allowed after the first attempt.
    pub max_retries: u32,
    /// Wait between fetch attempts.
    pub retry_delay: Duration,
    /// Concurrency ceiling for transfers within one target's batch.
    pub concurrency: usize,
}

impl RunConfig {
    /// Create a config with default retry and concurrency settings.
    pub fn new(source: impl Into<String>, targets: Vec<String>) -> Self {
        let transfer = TransferOptions::default();
        Self {
            source: source.into(),
            targets,
            skip_existing: false,
            file_list: None,
            max_retries: transfer.max_retries,
            retry_delay: transfer.retry_delay,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// Aggregation of all outcomes for one run against one target.
///
/// The three sets are disjoint and their union is exactly the work list's
/// address set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    /// Objects transferred and verified.
    pub synced_files: HashSet<ContentAddress>,
    /// Objects classified as directories and skipped.
    pub skipped_directories: HashSet<ContentAddress>,
    /// Objects whose transfer failed.
    pub failed_files: HashSet<ContentAddress>,
}

impl SyncResult {
    /// Fold a completed outcome list into a result.
    ///
    /// A single-threaded reducer over finished outcomes, so no locking is
    /// needed no matter how the batch interleaved.
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut result = SyncResult::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Synced(address) => {
                    result.synced_files.insert(address.clone());
                }
                Outcome::SkippedDirectory(address) => {
                    result.skipped_directories.insert(address.clone());
                }
                Outcome::Failed(address, _) => {
                    result.failed_files.insert(address.clone());
                }
            }
        }
        result
    }

    /// Total number of work items this result accounts for.
    pub fn total(&self) -> usize {
        self.synced_files.len() + self.skipped_directories.len() + self.failed_files.len()
    }
}

/// Outcome of a run against one target.
#[derive(Debug)]
pub struct TargetReport {
    /// The target's endpoint label.
    pub endpoint: String,
    /// The aggregated result, or the target-fatal error that aborted the
    /// cycle before any transfer ran.
    pub result: Result<SyncResult, SyncError>,
}

/// Outcome of a full run across all configured targets.
#[derive(Debug)]
pub struct RunReport {
    /// One report per target, in configured order.
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    /// Whether the run succeeded overall: no target errored and no target
    /// has failed files.
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(|t| match &t.result {
            Ok(result) => result.failed_files.is_empty(),
            Err(_) => false,
        })
    }
}

// =============================================================================
// run_sync
// =============================================================================

/// Run one sync cycle per target, sequentially, each independently resolving
/// its own work list against the shared source.
///
/// A target-fatal error (a listing failure) is recorded in that target's
/// report and does not prevent later targets from being attempted, keeping
/// the run best-effort across a whole fleet. Client construction is the
/// caller's concern; targets arrive as endpoint/client pairs.
pub async fn run_sync(
    config: &RunConfig,
    source: Arc<dyn StoreClient>,
    targets: Vec<(String, Arc<dyn StoreClient>)>,
) -> RunReport {
    let mut reports = Vec::with_capacity(targets.len());

    for (endpoint, target) in targets {
        info!("syncing to target node {}", endpoint);
        let result = sync_one_target(config, source.clone(), target).await;
        if let Err(e) = &result {
            error!("target {}: {}", endpoint, e);
        }
        reports.push(TargetReport { endpoint, result });
    }

    RunReport { targets: reports }
}

async fn sync_one_target(
    config: &RunConfig,
    source: Arc<dyn StoreClient>,
    target: Arc<dyn StoreClient>,
) -> Result<SyncResult, SyncError> {
    let items = collect_unsynced(
        source.as_ref(),
        target.as_ref(),
        config.skip_existing,
        config.file_list.as_deref(),
    )
    .await?;

    info!("{} objects need to be synced", items.len());

    let total = items.len();
    let options = config.transfer_options();

    let outcomes = run_batch(items, config.concurrency, move |item| {
        let source = source.clone();
        let target = target.clone();
        async move { transfer_object(source.as_ref(), target.as_ref(), &item, total, options).await }
    })
    .await;

    let result = SyncResult::from_outcomes(&outcomes);
    info!(
        "{}/{} objects synced, {} skipped (directories), {} failed",
        result.synced_files.len(),
        total,
        result.skipped_directories.len(),
        result.failed_files.len()
    );
    Ok(result)
}

// =============================================================================
// Tests
// =============================================================================
