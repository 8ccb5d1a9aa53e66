//! Pipeline stages: pure transforms over a `QuoteProposal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use omm_core::{MarketId, Price, Side, Size, TokenId, MAX_PRICE, MIN_PRICE, TICK};

use crate::proposal::{OrderProposal, QuoteProposal};

/// `base^exp` for small integer exponents.
fn decimal_powi(base: Decimal, exp: u32) -> Decimal {
    let mut acc = Decimal::ONE;
    for _ in 0..exp {
        acc *= base;
    }
    acc
}

/// Build the level-0 proposal. A side with zero size or a non-positive
/// price is omitted (bid-only / ask-only quoting).
pub fn create_base_proposal(
    market_id: &MarketId,
    token_id: &TokenId,
    bid_price: Price,
    ask_price: Price,
    bid_size: Size,
    ask_size: Size,
    mid: Price,
    reservation_price: Option<Price>,
) -> QuoteProposal {
    let mut proposal = QuoteProposal {
        market_id: market_id.clone(),
        token_id: token_id.clone(),
        bids: Vec::new(),
        asks: Vec::new(),
        mid,
        reservation_price: reservation_price.unwrap_or(mid),
    };
    if bid_size.is_positive() && bid_price.is_positive() {
        proposal.bids.push(OrderProposal {
            market_id: market_id.clone(),
            token_id: token_id.clone(),
            side: Side::Buy,
            price: bid_price,
            size: bid_size,
            level: 0,
            is_hanging: false,
        });
    }
    if ask_size.is_positive() && ask_price.is_positive() {
        proposal.asks.push(OrderProposal {
            market_id: market_id.clone(),
            token_id: token_id.clone(),
            side: Side::Sell,
            price: ask_price,
            size: ask_size,
            level: 0,
            is_hanging: false,
        });
    }
    proposal
}

/// Add ladder levels 1..n around level 0.
///
/// Each level widens its distance from mid by `spread_mult^level` and
/// grows size by `size_mult^level`.
pub fn apply_multi_level(
    mut proposal: QuoteProposal,
    levels: u32,
    spread_mult: Decimal,
    size_mult: Decimal,
) -> QuoteProposal {
    if levels <= 1 || proposal.is_empty() {
        return proposal;
    }

    let mid = proposal.mid;
    let base_bid = proposal.bids.first().cloned();
    let base_ask = proposal.asks.first().cloned();

    for level in 1..levels {
        let mult = decimal_powi(spread_mult, level);
        let sz_mult = decimal_powi(size_mult, level);

        if let Some(base) = &base_bid {
            let delta = mid.inner() - base.price.inner();
            let price = Price::new((mid.inner() - delta * mult).max(MIN_PRICE)).round_to_tick();
            proposal.bids.push(OrderProposal {
                price,
                size: Size::new((base.size.inner() * sz_mult).round_dp(1)),
                level,
                ..base.clone()
            });
        }

        if let Some(base) = &base_ask {
            let delta = base.price.inner() - mid.inner();
            let price = Price::new((mid.inner() + delta * mult).min(MAX_PRICE)).round_to_tick();
            proposal.asks.push(OrderProposal {
                price,
                size: Size::new((base.size.inner() * sz_mult).round_dp(1)),
                level,
                ..base.clone()
            });
        }
    }

    proposal
}

/// Widen every order's distance from mid by `multiplier`, in place.
fn widen_spreads(proposal: &mut QuoteProposal, multiplier: Decimal) {
    let mid = proposal.mid.inner();
    for order in &mut proposal.bids {
        let delta = mid - order.price.inner();
        order.price = Price::new((mid - delta * multiplier).max(MIN_PRICE)).round_to_tick();
    }
    for order in &mut proposal.asks {
        let delta = order.price.inner() - mid;
        order.price = Price::new((mid + delta * multiplier).min(MAX_PRICE)).round_to_tick();
    }
}

/// Widen spreads when volatility exceeds the threshold.
///
/// Multiplier `1 + (vol - threshold) / threshold`, capped at 2x.
pub fn apply_vol_adjustment(
    mut proposal: QuoteProposal,
    vol_pts: Decimal,
    threshold_pts: Decimal,
) -> QuoteProposal {
    if threshold_pts <= Decimal::ZERO || vol_pts <= threshold_pts {
        return proposal;
    }
    let multiplier = (Decimal::ONE + (vol_pts - threshold_pts) / threshold_pts).min(dec!(2));
    debug!(
        market = %proposal.market_id.short(),
        %vol_pts,
        %multiplier,
        "vol widening applied"
    );
    widen_spreads(&mut proposal, multiplier);
    proposal
}

/// Widen spreads by a fixed percentage when an external event-risk
/// signal fires.
pub fn apply_event_risk(
    mut proposal: QuoteProposal,
    risk_signaled: bool,
    widen_pct: Decimal,
) -> QuoteProposal {
    if !risk_signaled {
        return proposal;
    }
    let multiplier = Decimal::ONE + widen_pct / dec!(100);
    widen_spreads(&mut proposal, multiplier);
    proposal
}

/// Cap order sizes to the remaining USDC budget.
///
/// Orders are accepted greedily, bids first; the first order that would
/// overflow the budget is shrunk to fit if the shrunken size still clears
/// `min_viable_size`, and everything after it on that side is dropped.
/// Bids cost `size * price`; asks lock `size * (1 - price)`.
pub fn apply_budget_constraint(
    mut proposal: QuoteProposal,
    available_capital: Decimal,
    committed: Decimal,
    min_viable_size: Decimal,
) -> QuoteProposal {
    let remaining = available_capital - committed;
    if remaining <= Decimal::ZERO {
        proposal.bids.clear();
        proposal.asks.clear();
        return proposal;
    }

    let mut used = Decimal::ZERO;

    let mut bids = Vec::with_capacity(proposal.bids.len());
    for mut order in proposal.bids {
        let cost = order.size.inner() * order.price.inner();
        if used + cost > remaining {
            if order.price.is_positive() {
                let max_size = ((remaining - used) / order.price.inner()).round_dp(1);
                if max_size >= min_viable_size {
                    order.size = Size::new(max_size);
                    used += order.size.inner() * order.price.inner();
                    bids.push(order);
                }
            }
            break;
        }
        used += cost;
        bids.push(order);
    }

    let mut asks = Vec::with_capacity(proposal.asks.len());
    for mut order in proposal.asks {
        let unit_cost = Decimal::ONE - order.price.inner();
        let cost = order.size.inner() * unit_cost;
        if used + cost > remaining {
            if unit_cost > Decimal::ZERO {
                let max_size = ((remaining - used) / unit_cost).round_dp(1);
                if max_size >= min_viable_size {
                    order.size = Size::new(max_size);
                    used += order.size.inner() * unit_cost;
                    asks.push(order);
                }
            }
            break;
        }
        used += cost;
        asks.push(order);
    }

    proposal.bids = bids;
    proposal.asks = asks;
    proposal
}

/// Shift any crossing order back inside the book by one tick so the
/// venue's post-only check cannot reject it. Must run last.
pub fn apply_post_only_filter(
    mut proposal: QuoteProposal,
    best_bid: Price,
    best_ask: Price,
) -> QuoteProposal {
    if best_ask.is_positive() {
        for order in &mut proposal.bids {
            if order.price >= best_ask {
                order.price =
                    Price::new((best_ask.inner() - TICK).max(MIN_PRICE)).round_to_tick();
            }
        }
    }
    if best_bid.is_positive() {
        for order in &mut proposal.asks {
            if order.price <= best_bid {
                order.price =
                    Price::new((best_bid.inner() + TICK).min(MAX_PRICE)).round_to_tick();
            }
        }
    }
    proposal
}
