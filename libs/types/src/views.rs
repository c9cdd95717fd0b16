//! Derived view row shapes
//!
//! These are the two schema surfaces consumed by the read-only query
//! gateway: `preconf_txs` (one row per fully-correlated commitment, keyed
//! by commitment index + settlement hash) and `total_preconf_stats` (a
//! singleton aggregate row). Rows are produced wholesale on each refresh;
//! the stored base entities are never mutated to build them.

use crate::ids::{CommitmentIndex, TxHash};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One fully-correlated commitment: all three lifecycle stages joined with
/// the settlement transaction the opened stage references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconfTxRow {
    pub commitment_index: CommitmentIndex,
    /// Settlement transaction hash, canonical form. Forms the unique row
    /// key together with `commitment_index`.
    pub hash: TxHash,
    pub committer: String,
    pub commitment_digest: String,
    pub bidder: String,
    /// Raw bid in wei, unchanged from the stored event.
    pub bid: u128,
    /// `bid / 10^18`, exact decimal.
    pub bid_eth: Decimal,
    /// Time-based bid weighting; floored at zero, uncapped above one.
    pub decay_multiplier: Decimal,
    pub decayed_bid_eth: Decimal,
    pub is_slash: bool,
    /// Block the commitment was included in on the settlement chain.
    pub inclusion_block_number: u64,
    /// Settlement transaction timestamp, epoch milliseconds.
    pub timestamp_ms: u64,
    /// Builder identifier from the settlement block's extra data.
    pub builder_graffiti: String,
}

/// Singleton aggregate over all `preconf_txs` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalPreconfStats {
    pub total_commitments: u64,
    pub bidder_count: u64,
    pub total_decayed_bid_eth: Decimal,
    pub avg_decayed_bid_eth: Decimal,
    pub max_decayed_bid_eth: Decimal,
    pub min_decayed_bid_eth: Decimal,
}

impl TotalPreconfStats {
    /// The aggregate over zero rows: all sums, extrema, and counts zero.
    pub fn empty() -> Self {
        Self {
            total_commitments: 0,
            bidder_count: 0,
            total_decayed_bid_eth: Decimal::ZERO,
            avg_decayed_bid_eth: Decimal::ZERO,
            max_decayed_bid_eth: Decimal::ZERO,
            min_decayed_bid_eth: Decimal::ZERO,
        }
    }
}
