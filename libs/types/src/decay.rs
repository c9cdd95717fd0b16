//! Decay-weighted bid valuation
//!
//! A bid's effective value decays the later it is dispatched relative to
//! its decay window:
//!
//! ```text
//! decay_multiplier = max(0, (decay_end - decay_start) / (decay_end - dispatch))
//! decay_end == dispatch  =>  0
//! decayed_bid_eth = decay_multiplier * bid_eth
//! ```
//!
//! The multiplier is floored at zero but deliberately NOT capped at one: a
//! dispatch inside the decay window yields a multiplier above 1, and the
//! derived views preserve that. Uses `Decimal` for all arithmetic.

use rust_decimal::Decimal;
use thiserror::Error;

/// Wei per ETH exponent; `bid_eth = bid / 10^18`.
pub const WEI_SCALE: u32 = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecayError {
    #[error("bid {0} exceeds the representable decimal range")]
    BidOutOfRange(u128),
}

/// Compute the decay multiplier for a bid's timing parameters.
///
/// Timestamps are epoch milliseconds. The divisor special case
/// (`decay_end == dispatch`) short-circuits to zero; a negative ratio is
/// floored to zero; values above one are returned as-is.
pub fn decay_multiplier(decay_start: u64, decay_end: u64, dispatch: u64) -> Decimal {
    if decay_end == dispatch {
        return Decimal::ZERO;
    }
    let window = Decimal::from(signed_delta(decay_end, decay_start));
    let remaining = Decimal::from(signed_delta(decay_end, dispatch));
    let ratio = window / remaining;
    ratio.max(Decimal::ZERO)
}

/// Difference of two epoch-millisecond timestamps, saturated to `i64`.
fn signed_delta(a: u64, b: u64) -> i64 {
    let delta = a as i128 - b as i128;
    delta.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Convert a wei bid into its decimal ETH value, exactly.
pub fn bid_eth(bid_wei: u128) -> Result<Decimal, DecayError> {
    i128::try_from(bid_wei)
        .ok()
        .and_then(|b| Decimal::try_from_i128_with_scale(b, WEI_SCALE).ok())
        .ok_or(DecayError::BidOutOfRange(bid_wei))
}

/// Decay-weighted ETH value of a bid.
pub fn decayed_bid_eth(
    bid_wei: u128,
    decay_start: u64,
    decay_end: u64,
    dispatch: u64,
) -> Result<Decimal, DecayError> {
    Ok(decay_multiplier(decay_start, decay_end, dispatch) * bid_eth(bid_wei)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn test_multiplier_can_exceed_one() {
        // window = 100, remaining = 50: the formula only floors at zero,
        // it never caps at one.
        let m = decay_multiplier(100, 200, 150);
        assert_eq!(m, Decimal::from(2));
    }

    #[test]
    fn test_zero_divisor_is_zero() {
        assert_eq!(decay_multiplier(100, 500, 500), Decimal::ZERO);
        assert_eq!(decay_multiplier(0, 500, 500), Decimal::ZERO);
    }

    #[test]
    fn test_negative_ratio_floors_at_zero() {
        // dispatch after decay_end: remaining is negative, ratio is
        // negative, floored to zero.
        assert_eq!(decay_multiplier(100, 200, 300), Decimal::ZERO);
    }

    #[test]
    fn test_full_window_dispatch_midpoint() {
        let m = decay_multiplier(0, 100, 50);
        assert_eq!(m, Decimal::from(2));
        let m = decay_multiplier(50, 100, 50);
        assert_eq!(m, Decimal::ONE);
    }

    #[test]
    fn test_bid_eth_exact() {
        assert_eq!(bid_eth(1_000_000_000_000_000_000).unwrap(), Decimal::ONE);
        assert_eq!(
            bid_eth(1_500_000_000_000_000_000).unwrap(),
            Decimal::from_f64(1.5).unwrap()
        );
        assert_eq!(bid_eth(0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_decayed_bid() {
        let v = decayed_bid_eth(1_000_000_000_000_000_000, 0, 100, 50).unwrap();
        assert_eq!(v, Decimal::from(2));
    }

    proptest! {
        // Pins the observed formula: floored at zero, never capped above.
        #[test]
        fn prop_multiplier_floored_not_capped(
            start in 0u64..10_000,
            end in 0u64..10_000,
            dispatch in 0u64..10_000,
        ) {
            let m = decay_multiplier(start, end, dispatch);
            prop_assert!(m >= Decimal::ZERO);
            if end != dispatch && end > start && end > dispatch && dispatch < start {
                // Dispatch before the window opens: remaining exceeds the
                // window, so the multiplier stays below one.
                prop_assert!(m < Decimal::ONE);
            }
            if end != dispatch && dispatch > start && end > dispatch {
                // Dispatch inside the window: the multiplier exceeds one
                // and is preserved uncapped.
                prop_assert!(m > Decimal::ONE);
            }
        }
    }
}
