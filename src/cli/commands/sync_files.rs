//! The `sync-files` command: mirror the source node's pinned set onto the
//! target nodes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::Serialize;

use crate::cli::args::load_file_list;
use crate::cli::{CliError, Result};
use crate::client::{create_store_client, StoreClient};
use crate::sync::{run_sync, RunConfig, RunReport, DEFAULT_CONCURRENCY};

/// Arguments for the sync-files command.
#[derive(Args, Debug)]
pub struct SyncFilesArgs {
    /// Source node URL.
    #[arg(long)]
    pub from: String,

    /// Target node URL; may be given multiple times.
    #[arg(long, required = true)]
    pub to: Vec<String>,

    /// Skip objects already pinned on the target.
    #[arg(long = "skip-existing")]
    pub skip_existing: bool,

    /// File with one content address per line, used instead of the source's
    /// pin listing.
    #[arg(long = "file-list")]
    pub file_list: Option<PathBuf>,

    /// Fetch retries per object after the first attempt.
    #[arg(long = "max-retries", default_value_t = 3)]
    pub max_retries: u32,

    /// Milliseconds to wait between fetch attempts.
    #[arg(long = "retry-delay-ms", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Maximum transfers in flight per target.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

#[derive(Serialize)]
struct TargetSummary {
    target: String,
    synced: usize,
    skipped_directories: usize,
    failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SyncFilesArgs {
    pub async fn run(self, json: bool) -> Result<()> {
        let source: Arc<dyn StoreClient> = Arc::new(create_store_client(&self.from)?);
        let mut targets: Vec<(String, Arc<dyn StoreClient>)> = Vec::with_capacity(self.to.len());
        for endpoint in &self.to {
            let client: Arc<dyn StoreClient> = Arc::new(create_store_client(endpoint)?);
            targets.push((endpoint.clone(), client));
        }

        let file_list = match &self.file_list {
            Some(path) => Some(load_file_list(path).await?),
            None => None,
        };

        let config = RunConfig {
            source: self.from.clone(),
            targets: self.to.clone(),
            skip_existing: self.skip_existing,
            file_list,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            concurrency: self.concurrency,
        };

        println!("Syncing files");
        println!("Source node (--from): {}", self.from);
        for target in &self.to {
            println!("Target node (--to): {}", target);
        }

        let report = run_sync(&config, source, targets).await;
        print_report(&report, json)?;

        if report.is_success() {
            Ok(())
        } else {
            Err(CliError::SyncFailed)
        }
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    let summaries: Vec<TargetSummary> = report
        .targets
        .iter()
        .map(|target| match &target.result {
            Ok(result) => TargetSummary {
                target: target.endpoint.clone(),
                synced: result.synced_files.len(),
                skipped_directories: result.skipped_directories.len(),
                failed: result.failed_files.len(),
                error: None,
            },
            Err(e) => TargetSummary {
                target: target.endpoint.clone(),
                synced: 0,
                skipped_directories: 0,
                failed: 0,
                error: Some(e.to_string()),
            },
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for summary in &summaries {
        println!("---");
        println!("Target: {}", summary.target);
        match &summary.error {
            Some(error) => println!("Sync aborted: {}", error),
            None => {
                let total = summary.synced + summary.skipped_directories + summary.failed;
                println!("{}/{} files synced", summary.synced, total);
                println!("{} skipped (directories)", summary.skipped_directories);
                println!("{} failed", summary.failed);
            }
        }
    }
    Ok(())
}
