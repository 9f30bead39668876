//! Core identifiers shared by the raffle records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// On-chain raffle identifier. The store uses the same value as its key.
pub type RaffleId = u64;

/// Largest raffle id the store can key on (a signed 64-bit column).
pub const MAX_STORED_RAFFLE_ID: RaffleId = i64::MAX as u64;

/// Single-use ticket identifier (a UUID string embedded in the QR image).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

impl TicketId {
    /// Mint a fresh random ticket identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TicketId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TicketId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compare two hex addresses ignoring checksum casing.
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Lowercased form used for address set membership.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}
