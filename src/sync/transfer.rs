//! Transfer of a single work item: fetch with retry, store, verify.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::address::ContentAddress;
use crate::client::{ClientError, StoreClient, StoreOptions};
use crate::sync::resolve::WorkItem;

// =============================================================================
// Outcome Types
// =============================================================================

/// Why a transfer failed.
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// Every fetch attempt failed; `attempts` counts the first attempt plus
    /// all retries.
    FetchExhausted {
        /// Total number of fetch attempts made.
        attempts: u32,
        /// The error returned by the last attempt.
        last_error: ClientError,
    },

    /// The target's store call failed.
    Store(ClientError),

    /// The target derived a different address for the transferred bytes.
    IntegrityMismatch {
        /// The address the target returned.
        got: ContentAddress,
    },

    /// The worker failed outside the fetch/store/verify path.
    Unexpected(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::FetchExhausted {
                attempts,
                last_error,
            } => write!(f, "fetch failed after {} attempts: {}", attempts, last_error),
            FailureReason::Store(e) => write!(f, "store failed: {}", e),
            FailureReason::IntegrityMismatch { got } => {
                write!(f, "stored object hash differs: {}", got)
            }
            FailureReason::Unexpected(msg) => write!(f, "unexpected error: {}", msg),
        }
    }
}

/// The result of transferring one work item. Exactly one `Outcome` is
/// produced per item; the variants are mutually exclusive and exhaustive.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The object was transferred and the target derived the same address.
    Synced(ContentAddress),
    /// The object is a directory and has no flat byte representation.
    SkippedDirectory(ContentAddress),
    /// The transfer failed; the batch continues regardless.
    Failed(ContentAddress, FailureReason),
}

impl Outcome {
    /// The address of the work item this outcome belongs to.
    pub fn address(&self) -> &ContentAddress {
        match self {
            Outcome::Synced(address)
            | Outcome::SkippedDirectory(address)
            | Outcome::Failed(address, _) => address,
        }
    }
}

// =============================================================================
// Transfer Options
// =============================================================================

/// Retry policy for the fetch leg of a transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    /// Retries allowed after the first fetch attempt.
    pub max_retries: u32,
    /// Wait between fetch attempts.
    pub retry_delay: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

// =============================================================================
// transfer_object
// =============================================================================

/// Transfer one object from the source to the target and verify it kept its
/// address.
///
/// Only the fetch leg retries. Once bytes are in hand, a store error or an
/// address mismatch is reported rather than retried: a store call may have
/// side effects, and repeating it cannot resolve a mismatch. A directory
/// signal from either leg classifies the item as skipped without consuming
/// any retry budget.
pub async fn transfer_object(
    source: &dyn StoreClient,
    target: &dyn StoreClient,
    item: &WorkItem,
    total: usize,
    options: TransferOptions,
) -> Outcome {
    let label = format!("{}/{} ({})", item.index, total, item.address);
    debug!("{}: syncing", label);

    // Fetch with a bounded retry loop.
    let mut remaining = options.max_retries;
    let mut attempts: u32 = 1;
    let data = loop {
        match source.fetch(&item.address).await {
            Ok(data) => break data,
            Err(ClientError::IsDirectory) => {
                info!("{}: skipping, object is a directory", label);
                return Outcome::SkippedDirectory(item.address.clone());
            }
            Err(e) if remaining > 0 => {
                warn!(
                    "{}: failed to retrieve object ({}), retrying in {:?}",
                    label, e, options.retry_delay
                );
                tokio::time::sleep(options.retry_delay).await;
                remaining -= 1;
                attempts += 1;
            }
            Err(e) => {
                warn!(
                    "{}: failed to retrieve object after {} attempts: {}",
                    label, attempts, e
                );
                return Outcome::Failed(
                    item.address.clone(),
                    FailureReason::FetchExhausted {
                        attempts,
                        last_error: e,
                    },
                );
            }
        }
    };

    // Store under the source object's own address version so the target
    // derives a comparable address.
    debug!("{}: uploading object", label);
    let store_options = StoreOptions {
        address_version: item.address.version(),
    };
    let stored = match target.store(data, store_options).await {
        Ok(address) => address,
        Err(ClientError::IsDirectory) => {
            // Some addressing schemes only reveal containment at store time.
            info!("{}: skipping, object is a directory", label);
            return Outcome::SkippedDirectory(item.address.clone());
        }
        Err(e) => {
            warn!("{}: failed to upload object: {}", label, e);
            return Outcome::Failed(item.address.clone(), FailureReason::Store(e));
        }
    };

    // Verify identity before and after.
    if stored == item.address {
        info!("{}: object synced successfully", label);
        Outcome::Synced(item.address.clone())
    } else {
        warn!("{}: uploaded object hash differs: {}", label, stored);
        Outcome::Failed(
            item.address.clone(),
            FailureReason::IntegrityMismatch { got: stored },
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressVersion;
    use crate::client::{derive_address, MemoryStoreClient};

    fn item(address: ContentAddress) -> WorkItem {
        WorkItem { address, index: 0 }
    }

    fn fast_options(max_retries: u32) -> TransferOptions {
        TransferOptions {
            max_retries,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"content", AddressVersion::V0);

        let outcome =
            transfer_object(&source, &target, &item(address.clone()), 1, fast_options(0)).await;

        assert!(matches!(outcome, Outcome::Synced(a) if a == address));
        assert!(target.is_pinned(&address));
    }

    #[tokio::test]
    async fn test_preserves_v1_address_version() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"v1 content", AddressVersion::V1);

        let outcome =
            transfer_object(&source, &target, &item(address.clone()), 1, fast_options(0)).await;

        // The store call must request the source's version; with the wrong
        // version the memory store would derive a different address.
        assert!(matches!(outcome, Outcome::Synced(a) if a == address));
    }

    #[tokio::test]
    async fn test_retry_bound_success_on_last_attempt() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"flaky", AddressVersion::V0);
        source.script_fetch_faults(
            &address,
            vec![
                ClientError::Transient("1".to_string()),
                ClientError::Transient("2".to_string()),
            ],
        );

        // Two transient failures, two retries allowed: third attempt wins.
        let outcome =
            transfer_object(&source, &target, &item(address.clone()), 1, fast_options(2)).await;
        assert!(matches!(outcome, Outcome::Synced(a) if a == address));
    }

    #[tokio::test]
    async fn test_retry_bound_exhaustion() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"flaky", AddressVersion::V0);
        source.script_fetch_faults(
            &address,
            vec![
                ClientError::Transient("1".to_string()),
                ClientError::Transient("2".to_string()),
                ClientError::Transient("3".to_string()),
            ],
        );

        // Three failures but only two retries allowed.
        let outcome = transfer_object(&source, &target, &item(address), 1, fast_options(2)).await;
        match outcome {
            Outcome::Failed(_, FailureReason::FetchExhausted { attempts, .. }) => {
                assert_eq!(attempts, 3);
            }
            other => panic!("expected FetchExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_at_fetch_skips_without_retry() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_directory(b"dir");

        // Plenty of retry budget; none of it may be consumed.
        let start = std::time::Instant::now();
        let outcome = transfer_object(
            &source,
            &target,
            &item(address.clone()),
            1,
            TransferOptions {
                max_retries: 100,
                retry_delay: Duration::from_secs(10),
            },
        )
        .await;

        assert!(matches!(outcome, Outcome::SkippedDirectory(a) if a == address));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_directory_at_store_skips() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"late directory", AddressVersion::V0);
        target.set_store_fault(ClientError::IsDirectory);

        let outcome =
            transfer_object(&source, &target, &item(address.clone()), 1, fast_options(0)).await;
        assert!(matches!(outcome, Outcome::SkippedDirectory(a) if a == address));
    }

    #[tokio::test]
    async fn test_store_error_is_not_retried() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"content", AddressVersion::V0);
        target.set_store_fault(ClientError::Transient("disk full".to_string()));

        let outcome = transfer_object(&source, &target, &item(address), 1, fast_options(5)).await;
        assert!(matches!(
            outcome,
            Outcome::Failed(_, FailureReason::Store(ClientError::Transient(_)))
        ));
    }

    #[tokio::test]
    async fn test_integrity_mismatch_is_failure() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let address = source.add_object(b"content", AddressVersion::V0);
        let wrong = derive_address(b"something else", AddressVersion::V0);
        target.set_store_override(wrong.clone());

        let outcome =
            transfer_object(&source, &target, &item(address.clone()), 1, fast_options(0)).await;
        match outcome {
            Outcome::Failed(a, FailureReason::IntegrityMismatch { got }) => {
                assert_eq!(a, address);
                assert_eq!(got, wrong);
            }
            other => panic!("expected IntegrityMismatch, got {:?}", other),
        }
    }
}
