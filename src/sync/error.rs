//! Error types for the sync engine.

use thiserror::Error;

use crate::client::ClientError;

/// Errors that abort one target's sync run.
///
/// Per-item transfer failures are not errors at this level; they are
/// captured as [`Outcome`](super::Outcome) values. Only a failure to list a
/// store's pinned set is fatal, because without a listing there is no work
/// list to run.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The source node's pin listing failed.
    #[error("failed to list pinned objects on the source node: {0}")]
    SourceListing(#[source] ClientError),

    /// The target node's pin listing failed.
    #[error("failed to list pinned objects on the target node: {0}")]
    TargetListing(#[source] ClientError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
