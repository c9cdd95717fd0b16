//! Natural-key identifier types for pipeline entities
//!
//! Identifiers come from the protocol itself rather than being minted
//! locally: a commitment keeps the same `CommitmentIndex` across all three
//! lifecycle stages, and settlement transactions are addressed by their
//! chain hash. `TxHash` carries the normalization rule used everywhere a
//! commitment is joined against its settlement transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a commitment across its lifecycle stages.
///
/// The encrypted, opened, and processed stages of one commitment all carry
/// the same index; it is the join key for every derived view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommitmentIndex(u64);

impl CommitmentIndex {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommitmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A settlement-chain transaction hash in canonical form.
///
/// Opened commitments reference their settlement transaction without the
/// `0x` prefix while the settlement chain reports hashes with it. All
/// hashes are normalized to lowercase with a `0x` prefix on construction so
/// the two sides join on equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    /// Normalize a raw hash string into canonical `0x`-prefixed lowercase.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("0x") {
            Self(lower)
        } else {
            Self(format!("0x{lower}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
