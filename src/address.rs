//! Content addresses for pinned objects.
//!
//! A content address is the canonical string form of a content-derived
//! identifier (a cryptographic digest plus an encoding version). Two
//! addresses are equal iff they identify byte-identical content under the
//! same addressing scheme, so equality here is exact canonical-string
//! equality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alphabet used by version 0 addresses (base58btc, no `0`, `O`, `I`, `l`).
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Alphabet used by version 1 addresses (lowercase base32).
const BASE32_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz234567";

/// Length of the canonical string form of a version 0 address.
const V0_LENGTH: usize = 46;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when parsing a content address.
#[derive(Debug, Clone, Error)]
pub enum AddressError {
    /// The address string was empty.
    #[error("empty content address")]
    Empty,

    /// The address did not match any known encoding version.
    #[error("invalid content address '{0}': unrecognized encoding")]
    UnknownEncoding(String),

    /// The address contained a character outside its encoding's alphabet.
    #[error("invalid content address '{address}': illegal character '{character}'")]
    IllegalCharacter {
        /// The offending address string.
        address: String,
        /// The first character outside the alphabet.
        character: char,
    },

    /// The address had the wrong length for its encoding version.
    #[error("invalid content address '{0}': wrong length for a version 0 address")]
    BadLength(String),
}

// =============================================================================
// AddressVersion
// =============================================================================

/// Encoding version of a content address.
///
/// The version determines both the digest encoding and the alphabet of the
/// canonical string form. It is derived from the address itself, never from
/// a global default, so a transfer can ask the receiving store to derive an
/// address comparable to the source's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressVersion {
    /// Version 0: base58btc, always 46 characters starting with `Qm`.
    V0,
    /// Version 1: lowercase base32, starting with `b`.
    V1,
}

impl AddressVersion {
    /// The numeric version tag used by store node APIs.
    pub fn as_number(&self) -> u8 {
        match self {
            AddressVersion::V0 => 0,
            AddressVersion::V1 => 1,
        }
    }
}

impl fmt::Display for AddressVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_number())
    }
}

// =============================================================================
// ContentAddress
// =============================================================================

/// A content-derived identifier for a stored object.
///
/// Immutable, comparable, and hashable. The engine never invents addresses;
/// every `ContentAddress` originates from a store's pinned listing, an
/// explicit file list, or a store node's response to a store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Parse and validate a canonical address string.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        if s.starts_with("Qm") {
            if s.len() != V0_LENGTH {
                return Err(AddressError::BadLength(s.to_string()));
            }
            check_alphabet(s, BASE58_ALPHABET)?;
        } else if s.starts_with('b') && s.len() > 1 {
            check_alphabet(s, BASE32_ALPHABET)?;
        } else {
            return Err(AddressError::UnknownEncoding(s.to_string()));
        }

        Ok(ContentAddress(s.to_string()))
    }

    /// The encoding version, derived from the address's own prefix.
    pub fn version(&self) -> AddressVersion {
        if self.0.starts_with("Qm") {
            AddressVersion::V0
        } else {
            AddressVersion::V1
        }
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_alphabet(s: &str, alphabet: &str) -> Result<(), AddressError> {
    match s.chars().skip(1).find(|c| !alphabet.contains(*c)) {
        Some(character) => Err(AddressError::IllegalCharacter {
            address: s.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentAddress::parse(s)
    }
}

impl From<ContentAddress> for String {
    fn from(address: ContentAddress) -> String {
        address.0
    }
}

// =============================================================================
// Tests
// =============================================================================
