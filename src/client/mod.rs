mod http_client;
mod memory_client;
mod store_client;

pub use http_client::{create_store_client, HttpStoreClient};
pub use memory_client::{derive_address, MemoryStoreClient};
pub use store_client::{
    ClientError, PinKind, PinnedObject, Result, StoreClient, StoreOptions,
};
