//! Proposal types: staged, mutable quote builders.

use serde::{Deserialize, Serialize};

use omm_core::{MarketId, Price, Side, Size, TokenId};

/// A single proposed order (one side, one ladder level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProposal {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub side: Side,
    pub price: Price,
    pub size: Size,
    /// Ladder level: 0 = tightest.
    pub level: u32,
    /// Partially filled order kept live across a requote.
    pub is_hanging: bool,
}

/// Candidate order set for a single market, carried through the
/// pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteProposal {
    pub market_id: MarketId,
    pub token_id: TokenId,
    /// Bid ladder, level 0 first.
    pub bids: Vec<OrderProposal>,
    /// Ask ladder, level 0 first.
    pub asks: Vec<OrderProposal>,
    /// Market mid the pricing engine quoted around.
    pub mid: Price,
    /// AS reservation price; equals `mid` for the heuristic engine.
    pub reservation_price: Price,
}

impl QuoteProposal {
    /// True when every order was filtered out.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Tightest remaining bid, if any.
    pub fn best_bid(&self) -> Option<&OrderProposal> {
        self.bids.first()
    }

    /// Tightest remaining ask, if any.
    pub fn best_ask(&self) -> Option<&OrderProposal> {
        self.asks.first()
    }

    /// Total USDC the proposal would commit: bids cost `size * price`,
    /// asks lock NO-side collateral worth `size * (1 - price)`.
    pub fn total_cost(&self) -> rust_decimal::Decimal {
        let bid_cost: rust_decimal::Decimal = self
            .bids
            .iter()
            .map(|o| o.size.inner() * o.price.inner())
            .sum();
        let ask_cost: rust_decimal::Decimal = self
            .asks
            .iter()
            .map(|o| o.size.inner() * (rust_decimal::Decimal::ONE - o.price.inner()))
            .sum();
        bid_cost + ask_cost
    }
}
