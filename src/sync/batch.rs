//! Bounded-concurrency scheduling of transfer workers.

use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::sync::resolve::WorkItem;
use crate::sync::transfer::{FailureReason, Outcome};

/// Run a worker over every item with at most `concurrency` invocations in
/// flight at a time; as one completes, the next pending item is admitted.
///
/// Each worker runs inside its own task so a panicking worker is caught at
/// this boundary and converted to `Failed(address, Unexpected)` instead of
/// aborting the batch or starving the remaining items. The returned list
/// contains exactly one outcome per input item, in no particular order, and
/// the call does not return before every item has one.
pub async fn run_batch<F, Fut>(items: Vec<WorkItem>, concurrency: usize, worker: F) -> Vec<Outcome>
where
    F: Fn(WorkItem) -> Fut,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    let concurrency = concurrency.max(1);

    stream::iter(items.into_iter().map(|item| {
        let address = item.address.clone();
        let work = worker(item);
        async move {
            match tokio::spawn(work).await {
                Ok(outcome) => outcome,
                Err(e) => Outcome::Failed(address, FailureReason::Unexpected(e.to_string())),
            }
        }
    }))
    .buffer_unordered(concurrency)
    .collect()
    .await
}

// =============================================================================
// Tests
// =============================================================================
