//! pinsync-rs - mirrors the pinned objects of one content-addressed store
//! node onto others.

pub mod address;
pub mod cli;
pub mod client;
pub mod sync;

pub use address::{AddressError, AddressVersion, ContentAddress};

pub use client::{
    create_store_client, ClientError, HttpStoreClient, MemoryStoreClient, PinKind, PinnedObject,
    StoreClient, StoreOptions,
};

pub use sync::{
    collect_unsynced, run_batch, run_sync, transfer_object, FailureReason, Outcome, RunConfig,
    RunReport, SyncError, SyncResult, TargetReport, TransferOptions, WorkItem,
};
