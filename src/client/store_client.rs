//! The client interface to a content-addressed store node.
//!
//! The sync engine only ever talks to a node through [`StoreClient`], so the
//! engine is testable against an in-memory implementation and the real HTTP
//! adapter stays thin.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{AddressVersion, ContentAddress};

// =============================================================================
// Error Types
// =============================================================================

/// Error type for store client operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The object is not known to the node.
    #[error("object not found")]
    NotFound,

    /// The object is a directory and has no flat byte representation.
    ///
    /// This is a structural classification, not a failure; callers skip the
    /// object rather than retrying.
    #[error("object is a directory")]
    IsDirectory,

    /// A transient failure that may succeed on retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// The node could not be reached at all.
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// The node rejected the request's credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The node address could not be turned into a client.
    #[error(
        "invalid node URL: {0}\n\nThe URL must be of the following format: http(s)://host[:port]/[path]"
    )]
    InvalidUrl(String),

    /// The node answered with something the client could not interpret.
    #[error("invalid response from node: {0}")]
    InvalidResponse(String),
}

/// Result type for store client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// =============================================================================
// Listing Types
// =============================================================================

/// How an object is pinned on a store node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// Pinned together with everything it references.
    Recursive,
    /// Pinned by itself.
    Direct,
    /// Retained because a recursively pinned object references it.
    Indirect,
}

/// An object pinned on a store node, as reported by its pin listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedObject {
    /// The object's content address.
    pub address: ContentAddress,
    /// How the object is pinned.
    pub kind: PinKind,
}

// =============================================================================
// Store Options
// =============================================================================

/// Options for storing an object.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Address encoding version the node should use when deriving the
    /// stored object's address. Taken from the source object's own address
    /// so the two are comparable.
    pub address_version: AddressVersion,
}

// =============================================================================
// StoreClient Trait
// =============================================================================

/// Client capability of a content-addressed store node.
///
/// All operations are asynchronous and side-effect free on the client itself;
/// `store` pins the written object on the node.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// List every object pinned on the node.
    async fn list_pinned(&self) -> Result<Vec<PinnedObject>>;

    /// Fetch an object's bytes by address.
    ///
    /// Returns [`ClientError::IsDirectory`] if the address names a directory
    /// object rather than a flat byte stream.
    async fn fetch(&self, address: &ContentAddress) -> Result<Bytes>;

    /// Store bytes as a new pinned object and return the address the node
    /// derived for them.
    async fn store(&self, data: Bytes, options: StoreOptions) -> Result<ContentAddress>;
}
