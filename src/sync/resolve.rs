//! Work list resolution: which objects need to be transferred.

use std::collections::HashSet;

use crate::address::ContentAddress;
use crate::client::StoreClient;
use crate::sync::error::{Result, SyncError};

/// A pinned object selected for transfer in the current run.
///
/// `index` is the item's 0-based position after filtering and exists only
/// for the `index/total` progress label; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// The object's content address, always originating from the source's
    /// pinned set or an explicit file list.
    pub address: ContentAddress,
    /// Position in the filtered work list.
    pub index: usize,
}

/// Compute the work list for one target: objects pinned on the source but
/// not provably pinned on the target.
///
/// When `file_list` is given it is used verbatim as the candidate set and
/// the source is never asked for its pin listing. When `skip_existing` is
/// false the candidate set is returned unchanged and the engine relies on
/// the target store's own idempotence for objects that already exist there;
/// when true, candidates whose exact address is already pinned on the target
/// are dropped.
///
/// A listing failure on either side is fatal to this target's run and is
/// surfaced, never swallowed. There are no retries at this level.
pub async fn collect_unsynced(
    source: &dyn StoreClient,
    target: &dyn StoreClient,
    skip_existing: bool,
    file_list: Option<&[ContentAddress]>,
) -> Result<Vec<WorkItem>> {
    let candidates: Vec<ContentAddress> = match file_list {
        Some(list) => list.to_vec(),
        None => source
            .list_pinned()
            .await
            .map_err(SyncError::SourceListing)?
            .into_iter()
            .map(|pin| pin.address)
            .collect(),
    };

    let retained: Vec<ContentAddress> = if skip_existing {
        let target_pins: HashSet<ContentAddress> = target
            .list_pinned()
            .await
            .map_err(SyncError::TargetListing)?
            .into_iter()
            .map(|pin| pin.address)
            .collect();

        candidates
            .into_iter()
            .filter(|address| !target_pins.contains(address))
            .collect()
    } else {
        candidates
    };

    Ok(retained
        .into_iter()
        .enumerate()
        .map(|(index, address)| WorkItem { address, index })
        .collect())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressVersion;
    use crate::client::{ClientError, MemoryStoreClient, PinKind};

    #[tokio::test]
    async fn test_without_skip_existing_takes_everything() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let a = source.add_object(b"a", AddressVersion::V0);
        let b = source.add_object(b"b", AddressVersion::V0);
        // Target already has `a`, but without skip_existing we do not look.
        target.pin(a.clone(), PinKind::Recursive);

        let items = collect_unsynced(&source, &target, false, None).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].address, a);
        assert_eq!(items[0].index, 0);
        assert_eq!(items[1].address, b);
        assert_eq!(items[1].index, 1);
    }

    #[tokio::test]
    async fn test_skip_existing_filters_exact_matches() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        let a = source.add_object(b"a", AddressVersion::V0);
        let b = source.add_object(b"b", AddressVersion::V0);
        target.pin(a, PinKind::Recursive);

        let items = collect_unsynced(&source, &target, true, None).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].address, b);
        // Indices are reassigned after filtering.
        assert_eq!(items[0].index, 0);
    }

    #[tokio::test]
    async fn test_file_list_overrides_source_listing() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        source.add_object(b"unrelated", AddressVersion::V0);
        // A broken source listing must not matter when a file list is given.
        source.set_list_fault(ClientError::Unreachable("down".to_string()));

        let wanted = crate::client::derive_address(b"wanted", AddressVersion::V0);
        let items = collect_unsynced(&source, &target, false, Some(&[wanted.clone()]))
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].address, wanted);
    }

    #[tokio::test]
    async fn test_source_listing_failure_is_fatal() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        source.set_list_fault(ClientError::Unreachable("down".to_string()));

        let result = collect_unsynced(&source, &target, false, None).await;
        assert!(matches!(result, Err(SyncError::SourceListing(_))));
    }

    #[tokio::test]
    async fn test_target_listing_failure_is_fatal() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        source.add_object(b"a", AddressVersion::V0);
        target.set_list_fault(ClientError::Auth("denied".to_string()));

        let result = collect_unsynced(&source, &target, true, None).await;
        assert!(matches!(result, Err(SyncError::TargetListing(_))));
    }

    #[tokio::test]
    async fn test_target_listing_skipped_without_skip_existing() {
        let source = MemoryStoreClient::new();
        let target = MemoryStoreClient::new();
        source.add_object(b"a", AddressVersion::V0);
        target.set_list_fault(ClientError::Unreachable("down".to_string()));

        // The fault never fires because the target is not listed.
        let items = collect_unsynced(&source, &target, false, None).await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
