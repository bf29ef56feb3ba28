//! Argument helpers shared by CLI commands.

use std::path::Path;

use thiserror::Error;

use crate::address::{AddressError, ContentAddress};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during argument processing.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// I/O error reading an input file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file list line did not parse as a content address.
    #[error("invalid address on line {line}: {source}")]
    FileList {
        /// 1-based line number of the offending line.
        line: usize,
        /// The underlying parse error.
        source: AddressError,
    },
}

/// Result type for argument operations.
pub type Result<T> = std::result::Result<T, ArgsError>;

// =============================================================================
// File List Loading
// =============================================================================

/// Load an explicit file list: one content address per line, with blank
/// lines and `#` comments ignored.
pub async fn load_file_list(path: &Path) -> Result<Vec<ContentAddress>> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_file_list(&contents)
}

fn parse_file_list(contents: &str) -> Result<Vec<ContentAddress>> {
    let mut addresses = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let address = line.parse().map_err(|source| ArgsError::FileList {
            line: number + 1,
            source,
        })?;
        addresses.push(address);
    }
    Ok(addresses)
}

// =============================================================================
// Tests
// =============================================================================
