//! Heuristic delta/skew pricing.
//!
//! Computes a dynamic half-spread (delta) from volatility, book imbalance
//! and mid-price staleness, then shifts both quotes by an inventory skew
//! with a quadratic term that accelerates unwind at extreme inventory.
//!
//! All spread quantities are in points (1 pt = $0.01); prices are on the
//! [0.01, 0.99] outcome scale.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use omm_core::{Price, QuotePair, TICK};

/// Weights and bounds for the heuristic delta/skew model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicParams {
    /// Minimum half-spread in points.
    pub delta_min_pts: Decimal,
    /// Maximum half-spread in points.
    pub delta_max_pts: Decimal,
    /// Weight on tracked volatility (points).
    pub vol_weight: Decimal,
    /// Weight on absolute book imbalance.
    pub imbalance_weight: Decimal,
    /// Weight on staleness risk.
    pub stale_weight: Decimal,
    /// Weight on the fee buffer term.
    pub fee_weight: Decimal,
    /// Linear skew coefficient.
    pub skew_factor: Decimal,
    /// Quadratic skew coefficient (unwind urgency at extremes).
    pub quadratic_factor: Decimal,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            delta_min_pts: dec!(1.5),
            delta_max_pts: dec!(8.0),
            vol_weight: dec!(0.3),
            imbalance_weight: dec!(0.2),
            stale_weight: dec!(0.3),
            fee_weight: dec!(0.2),
            skew_factor: dec!(0.5),
            quadratic_factor: dec!(0.3),
        }
    }
}

/// Compute the dynamic half-spread in points.
///
/// `delta = clamp(a*vol + b*|imbalance|*10 + c*stale*5 + d*1, min, max)`
///
/// Imbalance is on [-1, 1] and staleness on [0, 1]; both are scaled to
/// points before weighting. Maker fees are zero on the venue, the fee
/// buffer term keeps a small cushion anyway.
pub fn compute_dynamic_delta(
    vol_pts: Decimal,
    book_imbalance: Decimal,
    stale_risk: Decimal,
    params: &HeuristicParams,
) -> Decimal {
    let raw = params.vol_weight * vol_pts
        + params.imbalance_weight * book_imbalance.abs() * dec!(10)
        + params.stale_weight * stale_risk * dec!(5)
        + params.fee_weight * Decimal::ONE;
    raw.max(params.delta_min_pts).min(params.delta_max_pts)
}

/// Inventory-driven quote shift in points.
///
/// `skew = -r*skew_factor - sign(r)*r^2*quadratic_factor` with the
/// inventory ratio `r` clamped to [-1, 1]. A long position produces a
/// negative skew (quotes shift down, favoring sells); the quadratic term
/// grows faster as inventory approaches capacity.
pub fn compute_skew(
    net_inventory: Decimal,
    max_inventory: Decimal,
    params: &HeuristicParams,
) -> Decimal {
    if max_inventory <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = (net_inventory / max_inventory)
        .max(dec!(-1))
        .min(Decimal::ONE);

    let linear = -ratio * params.skew_factor;
    let sign = if ratio > Decimal::ZERO {
        -Decimal::ONE
    } else {
        Decimal::ONE
    };
    let quadratic = sign * ratio * ratio * params.quadratic_factor;

    linear + quadratic
}

/// Derive bid/ask from mid, half-spread and skew (both in points).
///
/// Both sides are clamped to [0.01, 0.99] and rounded to tick. If rounding
/// inverts or collapses them, they are re-separated around the tick-rounded
/// mid by one tick each side.
pub fn compute_bid_ask(mid: Price, delta_pts: Decimal, skew_pts: Decimal) -> (Price, Price) {
    let delta = Price::from_points(delta_pts);
    let skew = Price::from_points(skew_pts);

    let bid = (mid - delta + skew).clamp_quotable().round_to_tick();
    let ask = (mid + delta + skew).clamp_quotable().round_to_tick();

    if bid >= ask {
        let mid_tick = mid.round_to_tick();
        let bid = Price::new(mid_tick.inner() - TICK)
            .clamp_quotable()
            .round_to_tick();
        let ask = Price::new(mid_tick.inner() + TICK)
            .clamp_quotable()
            .round_to_tick();
        return (bid, ask);
    }

    (bid, ask)
}

/// Quote size in USDC for one side, respecting inventory and capital caps.
///
/// Returns zero when inventory already fills capacity. `current_inventory`
/// is the absolute inventory notional in USDC (shares pre-converted at
/// average entry).
pub fn compute_quote_size(
    capital: Decimal,
    max_per_market: Decimal,
    current_inventory_usdc: Decimal,
    max_inventory_usdc: Decimal,
    base_size_usd: Decimal,
) -> Decimal {
    let remaining = max_inventory_usdc - current_inventory_usdc.abs();
    if remaining <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let size = base_size_usd
        .min(max_per_market)
        .min(capital * dec!(0.1))
        .min(remaining);
    size.max(Decimal::ZERO).round_dp(2)
}

/// True when the mid has moved far enough from the active quote to
/// warrant a requote.
///
/// Compares against `quoted_mid` (the market mid observed at quote time);
/// `(bid+ask)/2` is wrong for one-sided pairs.
pub fn should_requote(current: Option<&QuotePair>, new_mid: Price, threshold_pts: Decimal) -> bool {
    let Some(pair) = current else {
        return true;
    };
    let reference = if pair.quoted_mid.is_positive() {
        pair.quoted_mid
    } else {
        pair.mid()
    };
    new_mid.distance_points(reference) >= threshold_pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use omm_core::{MarketId, Size, TokenId};

    fn params() -> HeuristicParams {
        HeuristicParams::default()
    }

    #[test]
    fn test_delta_floors_at_min() {
        // Calm market: 0.3*0 + 0.2*0 + 0.3*0 + 0.2 = 0.2, floored to 1.5.
        let d = compute_dynamic_delta(dec!(0), dec!(0), dec!(0), &params());
        assert_eq!(d, dec!(1.5));
    }

    #[test]
    fn test_delta_caps_at_max() {
        let d = compute_dynamic_delta(dec!(100), dec!(1), dec!(1), &params());
        assert_eq!(d, dec!(8.0));
    }

    #[test]
    fn test_delta_components() {
        // 0.3*5 + 0.2*0.5*10 + 0.3*0.4*5 + 0.2 = 1.5 + 1.0 + 0.6 + 0.2 = 3.3
        let d = compute_dynamic_delta(dec!(5), dec!(0.5), dec!(0.4), &params());
        assert_eq!(d, dec!(3.3));
    }

    #[test]
    fn test_skew_zero_when_flat() {
        assert_eq!(compute_skew(dec!(0), dec!(100), &params()), dec!(0));
    }

    #[test]
    fn test_skew_negative_when_long() {
        // r = 0.5: linear = -0.25, quadratic = -0.25*0.3 = -0.075
        let s = compute_skew(dec!(50), dec!(100), &params());
        assert_eq!(s, dec!(-0.325));
    }

    #[test]
    fn test_skew_quadratic_accelerates_at_extremes() {
        let half = compute_skew(dec!(50), dec!(100), &params());
        let full = compute_skew(dec!(100), dec!(100), &params());
        // r = 1: linear = -0.5, quadratic = -0.3; more than double the half case.
        assert_eq!(full, dec!(-0.8));
        assert!(full < half * dec!(2));
    }

    #[test]
    fn test_skew_symmetric_when_short() {
        let long = compute_skew(dec!(80), dec!(100), &params());
        let short = compute_skew(dec!(-80), dec!(100), &params());
        assert_eq!(long, -short);
    }

    #[test]
    fn test_skew_ratio_clamped() {
        let over = compute_skew(dec!(500), dec!(100), &params());
        let at_cap = compute_skew(dec!(100), dec!(100), &params());
        assert_eq!(over, at_cap);
    }

    #[test]
    fn test_skew_zero_capacity() {
        assert_eq!(compute_skew(dec!(10), dec!(0), &params()), dec!(0));
    }

    #[test]
    fn test_bid_ask_plain() {
        // mid 0.50, delta 2 pts, no skew -> 0.48 / 0.52
        let (bid, ask) = compute_bid_ask(Price::new(dec!(0.50)), dec!(2), dec!(0));
        assert_eq!(bid.inner(), dec!(0.48));
        assert_eq!(ask.inner(), dec!(0.52));
    }

    #[test]
    fn test_bid_ask_skew_shifts_both() {
        let (bid, ask) = compute_bid_ask(Price::new(dec!(0.50)), dec!(2), dec!(-1));
        assert_eq!(bid.inner(), dec!(0.47));
        assert_eq!(ask.inner(), dec!(0.51));
    }

    #[test]
    fn test_bid_ask_reseparated_when_collapsed() {
        // Tiny delta rounds both sides onto the same tick.
        let (bid, ask) = compute_bid_ask(Price::new(dec!(0.50)), dec!(0.2), dec!(0));
        assert_eq!(bid.inner(), dec!(0.49));
        assert_eq!(ask.inner(), dec!(0.51));
        assert!(bid < ask);
    }

    #[test]
    fn test_bid_ask_clamped_near_bounds() {
        let (bid, ask) = compute_bid_ask(Price::new(dec!(0.98)), dec!(4), dec!(0));
        assert!(bid.inner() >= dec!(0.01));
        assert!(ask.inner() <= dec!(0.99));
        assert!(bid < ask);
    }

    #[test]
    fn test_quote_size_basic() {
        let s = compute_quote_size(dec!(1000), dec!(50), dec!(0), dec!(100), dec!(5));
        assert_eq!(s, dec!(5));
    }

    #[test]
    fn test_quote_size_zero_at_capacity() {
        let s = compute_quote_size(dec!(1000), dec!(50), dec!(100), dec!(100), dec!(5));
        assert_eq!(s, dec!(0));
        let short_side = compute_quote_size(dec!(1000), dec!(50), dec!(-120), dec!(100), dec!(5));
        assert_eq!(short_side, dec!(0));
    }

    #[test]
    fn test_quote_size_limited_by_capital() {
        // 10% of capital binds: 0.1 * 30 = 3.
        let s = compute_quote_size(dec!(30), dec!(50), dec!(0), dec!(100), dec!(5));
        assert_eq!(s, dec!(3));
    }

    #[test]
    fn test_quote_size_shrinks_to_remaining_capacity() {
        let s = compute_quote_size(dec!(1000), dec!(50), dec!(98), dec!(100), dec!(5));
        assert_eq!(s, dec!(2));
    }

    fn pair_with_quoted_mid(mid: Decimal) -> QuotePair {
        let mut p = QuotePair::new(
            MarketId::new("mkt"),
            TokenId::new("tok"),
            Price::new(dec!(0.48)),
            Price::new(dec!(0.52)),
            Size::new(dec!(10)),
            Size::new(dec!(10)),
        );
        p.quoted_mid = Price::new(mid);
        p
    }

    #[test]
    fn test_should_requote_no_pair() {
        assert!(should_requote(None, Price::new(dec!(0.50)), dec!(0.5)));
    }

    #[test]
    fn test_should_requote_threshold() {
        let p = pair_with_quoted_mid(dec!(0.50));
        // 0.4 pts move: hold.
        assert!(!should_requote(
            Some(&p),
            Price::new(dec!(0.504)),
            dec!(0.5)
        ));
        // 0.5 pts move: requote.
        assert!(should_requote(Some(&p), Price::new(dec!(0.505)), dec!(0.5)));
    }

    #[test]
    fn test_should_requote_falls_back_to_pair_mid() {
        let p = pair_with_quoted_mid(dec!(0));
        // quoted_mid unset: compares against (0.48+0.52)/2 = 0.50.
        assert!(should_requote(Some(&p), Price::new(dec!(0.51)), dec!(0.5)));
        assert!(!should_requote(
            Some(&p),
            Price::new(dec!(0.501)),
            dec!(0.5)
        ));
    }
}
