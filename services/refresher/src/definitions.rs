//! View definitions
//!
//! The declarative set of aggregate queries, one per derived view, in
//! their fixed refresh order. Each definition recomputes its result
//! wholesale from the store's current state; nothing is updated
//! incrementally, and the two views read the store independently of each
//! other.
//!
//! All bid arithmetic happens here: stored bids stay raw wei integers and
//! only become `bid_eth`, `decay_multiplier`, and `decayed_bid_eth` inside
//! a computed row.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use timeseries_store::{TimeSeriesStore, ViewData, ViewName};
use types::decay::{bid_eth, decay_multiplier};
use types::ids::{CommitmentIndex, TxHash};
use types::views::{PreconfTxRow, TotalPreconfStats};

use crate::error::RefreshError;

/// A derived view: a name plus the query that rebuilds it.
pub struct ViewDefinition {
    pub name: ViewName,
    compute: fn(&TimeSeriesStore) -> Result<ViewData, RefreshError>,
}

impl ViewDefinition {
    /// Recompute this view's full contents from the store.
    pub fn compute(&self, store: &TimeSeriesStore) -> Result<ViewData, RefreshError> {
        (self.compute)(store)
    }
}

/// All view definitions, in declared refresh order.
pub fn all_views() -> &'static [ViewDefinition] {
    &[
        ViewDefinition {
            name: ViewName::PreconfTxs,
            compute: compute_preconf_txs,
        },
        ViewDefinition {
            name: ViewName::TotalPreconfStats,
            compute: compute_total_preconf_stats,
        },
    ]
}

/// Look up a definition by name.
pub fn definition(name: ViewName) -> &'static ViewDefinition {
    match name {
        ViewName::PreconfTxs => &all_views()[0],
        ViewName::TotalPreconfStats => &all_views()[1],
    }
}

/// One row per fully-correlated commitment, keyed by
/// `(commitment_index, hash)`.
fn compute_preconf_txs(store: &TimeSeriesStore) -> Result<ViewData, RefreshError> {
    // BTreeMap keyed like the view's unique index: deterministic order
    // and no duplicate keys by construction.
    let mut rows: BTreeMap<(CommitmentIndex, TxHash), PreconfTxRow> = BTreeMap::new();

    for joined in store.correlated_commitments()? {
        let multiplier = decay_multiplier(
            joined.opened.decay_start_timestamp,
            joined.opened.decay_end_timestamp,
            joined.opened.dispatch_timestamp,
        );
        let eth = bid_eth(joined.opened.bid)?;

        let row = PreconfTxRow {
            commitment_index: joined.encrypted.commitment_index,
            hash: joined.settlement.hash.clone(),
            committer: joined.encrypted.committer,
            commitment_digest: joined.encrypted.commitment_digest,
            bidder: joined.opened.bidder,
            bid: joined.opened.bid,
            bid_eth: eth,
            decay_multiplier: multiplier,
            decayed_bid_eth: multiplier * eth,
            is_slash: joined.processed.is_slash,
            inclusion_block_number: joined.opened.block_number,
            timestamp_ms: joined.settlement.timestamp_ms,
            builder_graffiti: joined.settlement.extra_data,
        };
        rows.insert((row.commitment_index, row.hash.clone()), row);
    }

    Ok(ViewData::PreconfTxs(rows.into_values().collect()))
}

/// Singleton aggregate over the fully-correlated commitments.
fn compute_total_preconf_stats(store: &TimeSeriesStore) -> Result<ViewData, RefreshError> {
    let ViewData::PreconfTxs(rows) = compute_preconf_txs(store)? else {
        unreachable!("preconf_txs definition computes preconf rows");
    };

    if rows.is_empty() {
        return Ok(ViewData::TotalPreconfStats(TotalPreconfStats::empty()));
    }

    let mut total = Decimal::ZERO;
    let mut max = rows[0].decayed_bid_eth;
    let mut min = rows[0].decayed_bid_eth;
    let mut bidders: BTreeSet<&str> = BTreeSet::new();
    for row in &rows {
        total += row.decayed_bid_eth;
        max = max.max(row.decayed_bid_eth);
        min = min.min(row.decayed_bid_eth);
        bidders.insert(row.bidder.as_str());
    }
    let count = rows.len() as u64;

    Ok(ViewData::TotalPreconfStats(TotalPreconfStats {
        total_commitments: count,
        bidder_count: bidders.len() as u64,
        total_decayed_bid_eth: total,
        avg_decayed_bid_eth: total / Decimal::from(count),
        max_decayed_bid_eth: max,
        min_decayed_bid_eth: min,
    }))
}
