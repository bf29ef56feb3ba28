//! An in-memory implementation of `StoreClient`, intended primarily for
//! testing the sync engine.
//!
//! Addresses are derived deterministically from content (sha-256 mapped into
//! the address alphabet), so a transfer between two memory clients verifies
//! cleanly unless a fault is scripted. Supported faults: per-address fetch
//! error sequences, a forced store address, a store error, and listing
//! errors. An in-flight counter with a high-water mark makes the concurrency
//! bound observable.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::store_client::{ClientError, PinKind, PinnedObject, Result, StoreOptions, StoreClient};
use crate::address::{AddressVersion, ContentAddress};

const BASE58_SUBSET: &[u8] = b"123456789abcdefg";
const BASE32_SUBSET: &[u8] = b"abcdefghjklmnopq";

/// Derive the address a memory store assigns to the given bytes.
///
/// Not a real encoding; it only guarantees that identical bytes under the
/// same version always yield the same valid address, which is all the
/// engine's verification step relies on.
pub fn derive_address(data: &[u8], version: AddressVersion) -> ContentAddress {
    let digest = Sha256::digest(data);

    let (prefix, alphabet, length) = match version {
        AddressVersion::V0 => ("Qm", BASE58_SUBSET, 44),
        AddressVersion::V1 => ("b", BASE32_SUBSET, 51),
    };

    let mut text = String::from(prefix);
    for i in 0..length {
        let byte = digest[(i / 2) % digest.len()];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        text.push(alphabet[nibble as usize] as char);
    }

    ContentAddress::parse(&text).unwrap()
}

/// RAII guard for the in-flight counter.
struct InFlightGuard<'a> {
    client: &'a MemoryStoreClient,
}

impl<'a> InFlightGuard<'a> {
    fn enter(client: &'a MemoryStoreClient) -> Self {
        let now = client.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        client.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { client }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.client.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An in-memory store node.
#[derive(Default)]
pub struct MemoryStoreClient {
    objects: RwLock<HashMap<ContentAddress, Bytes>>,
    pinned: RwLock<Vec<PinnedObject>>,
    directories: RwLock<HashSet<ContentAddress>>,
    fetch_faults: Mutex<HashMap<ContentAddress, VecDeque<ClientError>>>,
    store_fault: Mutex<Option<ClientError>>,
    store_override: Mutex<Option<ContentAddress>>,
    list_fault: Mutex<Option<ClientError>>,
    io_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStoreClient {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add and pin an object, returning its derived address.
    pub fn add_object(&self, data: &[u8], version: AddressVersion) -> ContentAddress {
        let address = derive_address(data, version);
        self.objects
            .write()
            .unwrap()
            .insert(address.clone(), Bytes::copy_from_slice(data));
        self.pin(address.clone(), PinKind::Recursive);
        address
    }

    /// Add and pin a directory object under a synthetic address.
    pub fn add_directory(&self, seed: &[u8]) -> ContentAddress {
        let address = derive_address(seed, AddressVersion::V0);
        self.directories.write().unwrap().insert(address.clone());
        self.pin(address.clone(), PinKind::Recursive);
        address
    }

    /// Record an address in the pin listing without storing content.
    pub fn pin(&self, address: ContentAddress, kind: PinKind) {
        self.pinned.write().unwrap().push(PinnedObject { address, kind });
    }

    /// Whether the pin listing contains the given address.
    pub fn is_pinned(&self, address: &ContentAddress) -> bool {
        self.pinned
            .read()
            .unwrap()
            .iter()
            .any(|p| &p.address == address)
    }

    /// Script a sequence of errors for fetches of one address; once the
    /// sequence is exhausted, fetches behave normally again.
    pub fn script_fetch_faults(&self, address: &ContentAddress, faults: Vec<ClientError>) {
        self.fetch_faults
            .lock()
            .unwrap()
            .insert(address.clone(), faults.into());
    }

    /// Make every store call fail with the given error.
    pub fn set_store_fault(&self, fault: ClientError) {
        *self.store_fault.lock().unwrap() = Some(fault);
    }

    /// Make every store call return the given address instead of the
    /// derived one.
    pub fn set_store_override(&self, address: ContentAddress) {
        *self.store_override.lock().unwrap() = Some(address);
    }

    /// Make the pin listing fail with the given error.
    pub fn set_list_fault(&self, fault: ClientError) {
        *self.list_fault.lock().unwrap() = Some(fault);
    }

    /// Add an artificial delay to fetch and store calls so concurrent
    /// operations overlap observably.
    pub fn set_io_delay(&self, delay: Duration) {
        *self.io_delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of simultaneously in-flight fetch/store calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_io(&self) {
        let delay = *self.io_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StoreClient for MemoryStoreClient {
    async fn list_pinned(&self) -> Result<Vec<PinnedObject>> {
        if let Some(fault) = self.list_fault.lock().unwrap().clone() {
            return Err(fault);
        }
        Ok(self.pinned.read().unwrap().clone())
    }

    async fn fetch(&self, address: &ContentAddress) -> Result<Bytes> {
        let _guard = InFlightGuard::enter(self);
        self.simulate_io().await;

        let scripted = {
            let mut faults = self.fetch_faults.lock().unwrap();
            faults.get_mut(address).and_then(|queue| queue.pop_front())
        };
        if let Some(fault) = scripted {
            return Err(fault);
        }

        if self.directories.read().unwrap().contains(address) {
            return Err(ClientError::IsDirectory);
        }

        self.objects
            .read()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn store(&self, data: Bytes, options: StoreOptions) -> Result<ContentAddress> {
        let _guard = InFlightGuard::enter(self);
        self.simulate_io().await;

        if let Some(fault) = self.store_fault.lock().unwrap().clone() {
            return Err(fault);
        }

        let address = match self.store_override.lock().unwrap().clone() {
            Some(address) => address,
            None => derive_address(&data, options.address_version),
        };

        self.objects
            .write()
            .unwrap()
            .insert(address.clone(), data);
        self.pin(address.clone(), PinKind::Recursive);
        Ok(address)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_object_roundtrip() {
        let client = MemoryStoreClient::new();
        let address = client.add_object(b"hello world", AddressVersion::V0);

        assert!(client.is_pinned(&address));
        assert_eq!(
            client.fetch(&address).await.unwrap(),
            Bytes::from_static(b"hello world")
        );
    }

    #[tokio::test]
    async fn test_store_derives_stable_address() {
        let client = MemoryStoreClient::new();
        let stored = client
            .store(
                Bytes::from_static(b"payload"),
                StoreOptions {
                    address_version: AddressVersion::V0,
                },
            )
            .await
            .unwrap();

        assert_eq!(stored, derive_address(b"payload", AddressVersion::V0));
        assert_eq!(stored.version(), AddressVersion::V0);
        assert!(client.is_pinned(&stored));
    }

    #[tokio::test]
    async fn test_versions_derive_distinct_addresses() {
        let v0 = derive_address(b"same bytes", AddressVersion::V0);
        let v1 = derive_address(b"same bytes", AddressVersion::V1);
        assert_eq!(v0.version(), AddressVersion::V0);
        assert_eq!(v1.version(), AddressVersion::V1);
        assert_ne!(v0, v1);
    }

    #[tokio::test]
    async fn test_fetch_nonexistent() {
        let client = MemoryStoreClient::new();
        let address = derive_address(b"missing", AddressVersion::V0);
        assert!(matches!(
            client.fetch(&address).await,
            Err(ClientError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_fetch_directory() {
        let client = MemoryStoreClient::new();
        let address = client.add_directory(b"dir");
        assert!(matches!(
            client.fetch(&address).await,
            Err(ClientError::IsDirectory)
        ));
    }

    #[tokio::test]
    async fn test_scripted_fetch_faults_run_out() {
        let client = MemoryStoreClient::new();
        let address = client.add_object(b"flaky", AddressVersion::V0);
        client.script_fetch_faults(
            &address,
            vec![ClientError::Transient("glitch".to_string())],
        );

        assert!(matches!(
            client.fetch(&address).await,
            Err(ClientError::Transient(_))
        ));
        assert!(client.fetch(&address).await.is_ok());
    }
}
