//! Quote pair: one bid + one ask on a single market/token.
//!
//! A `QuotePair` is owned exclusively by the quoter handling its market and
//! is mutated only through the validated per-side transition methods. Once
//! both sides are terminal the pair is discarded; fills are externalized
//! into the inventory ledger and the persisted fill record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decimal::{Price, Size};
use crate::ids::{ConditionId, MarketId, OrderId, TokenId};
use crate::order::{can_transition, InvalidTransition, OrderState};

/// Outcome of a per-side state transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State was updated.
    Applied,
    /// Target equals the current state; nothing to do (idempotent).
    Unchanged,
}

/// A bid+ask quote pair on a single market.
///
/// Sides are independently sizeable and independently omittable: a bid-only
/// pair carries `ask_state: Cancelled` from creation. `quoted_mid` records
/// the market mid observed at quote time; the derived `mid()` of a one-sided
/// pair is meaningless for requote comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotePair {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub no_token_id: Option<TokenId>,
    pub condition_id: Option<ConditionId>,
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_size: Size,
    pub ask_size: Size,
    pub bid_order_id: Option<OrderId>,
    pub ask_order_id: Option<OrderId>,
    pub bid_state: OrderState,
    pub ask_state: OrderState,
    /// Market mid observed when the quote was computed.
    pub quoted_mid: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuotePair {
    /// Create a pair with both sides pending placement.
    pub fn new(
        market_id: MarketId,
        token_id: TokenId,
        bid_price: Price,
        ask_price: Price,
        bid_size: Size,
        ask_size: Size,
    ) -> Self {
        let now = Utc::now();
        Self {
            market_id,
            token_id,
            no_token_id: None,
            condition_id: None,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            bid_order_id: None,
            ask_order_id: None,
            bid_state: OrderState::New,
            ask_state: OrderState::New,
            quoted_mid: Price::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Quoted spread: ask - bid.
    pub fn spread(&self) -> Price {
        self.ask_price - self.bid_price
    }

    /// Midpoint of the quoted prices.
    ///
    /// Meaningless for one-sided pairs; prefer `quoted_mid` when set.
    pub fn mid(&self) -> Price {
        Price::new((self.bid_price.inner() + self.ask_price.inner()) / rust_decimal::Decimal::TWO)
    }

    /// Either side can still produce a fill.
    pub fn is_active(&self) -> bool {
        self.bid_state.is_open() || self.ask_state.is_open()
    }

    /// Both sides completely filled.
    pub fn is_fully_filled(&self) -> bool {
        self.bid_state == OrderState::Filled && self.ask_state == OrderState::Filled
    }

    /// Both sides done (filled or cancelled).
    pub fn is_terminal(&self) -> bool {
        self.bid_state.is_done() && self.ask_state.is_done()
    }

    /// Transition the bid side. Idempotent; invalid transitions are
    /// rejected with the state unchanged.
    pub fn update_bid_state(
        &mut self,
        new_state: OrderState,
    ) -> Result<Transition, InvalidTransition> {
        if new_state == self.bid_state {
            return Ok(Transition::Unchanged);
        }
        if !can_transition(self.bid_state, new_state) {
            let err = InvalidTransition {
                from: self.bid_state,
                to: new_state,
            };
            warn!(market = %self.market_id.short(), %err, "rejected bid transition");
            return Err(err);
        }
        self.bid_state = new_state;
        self.updated_at = Utc::now();
        Ok(Transition::Applied)
    }

    /// Transition the ask side. Idempotent; invalid transitions are
    /// rejected with the state unchanged.
    pub fn update_ask_state(
        &mut self,
        new_state: OrderState,
    ) -> Result<Transition, InvalidTransition> {
        if new_state == self.ask_state {
            return Ok(Transition::Unchanged);
        }
        if !can_transition(self.ask_state, new_state) {
            let err = InvalidTransition {
                from: self.ask_state,
                to: new_state,
            };
            warn!(market = %self.market_id.short(), %err, "rejected ask transition");
            return Err(err);
        }
        self.ask_state = new_state;
        self.updated_at = Utc::now();
        Ok(Transition::Applied)
    }

    /// Seconds since the pair was created.
    pub fn age_seconds(&self) -> f64 {
        (Utc::now() - self.created_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pair() -> QuotePair {
        QuotePair::new(
            MarketId::new("mkt-1"),
            TokenId::new("tok-yes"),
            Price::new(dec!(0.48)),
            Price::new(dec!(0.52)),
            Size::new(dec!(10)),
            Size::new(dec!(10)),
        )
    }

    #[test]
    fn test_spread_and_mid() {
        let p = pair();
        assert_eq!(p.spread().inner(), dec!(0.04));
        assert_eq!(p.mid().inner(), dec!(0.50));
    }

    #[test]
    fn test_new_pair_is_active() {
        let p = pair();
        assert!(p.is_active());
        assert!(!p.is_fully_filled());
        assert!(!p.is_terminal());
    }

    #[test]
    fn test_filled_transition_idempotent() {
        let mut p = pair();
        assert_eq!(
            p.update_bid_state(OrderState::Filled).unwrap(),
            Transition::Applied
        );
        // Re-reporting the fill is a no-op, not an error.
        assert_eq!(
            p.update_bid_state(OrderState::Filled).unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_live_after_filled_rejected() {
        let mut p = pair();
        p.update_bid_state(OrderState::Filled).unwrap();
        let err = p.update_bid_state(OrderState::Live).unwrap_err();
        assert_eq!(err.from, OrderState::Filled);
        assert_eq!(err.to, OrderState::Live);
        // State must remain FILLED after the rejected transition.
        assert_eq!(p.bid_state, OrderState::Filled);
    }

    #[test]
    fn test_fill_after_cancel_race() {
        let mut p = pair();
        p.update_ask_state(OrderState::Live).unwrap();
        p.update_ask_state(OrderState::Cancelled).unwrap();
        // A fill that raced the cancel is accepted.
        assert_eq!(
            p.update_ask_state(OrderState::Filled).unwrap(),
            Transition::Applied
        );
        assert_eq!(p.ask_state, OrderState::Filled);
    }

    #[test]
    fn test_terminal_when_both_done() {
        let mut p = pair();
        p.update_bid_state(OrderState::Filled).unwrap();
        assert!(!p.is_terminal());
        p.update_ask_state(OrderState::Cancelled).unwrap();
        assert!(p.is_terminal());
        assert!(!p.is_fully_filled());
    }

    #[test]
    fn test_fully_filled() {
        let mut p = pair();
        p.update_bid_state(OrderState::Filled).unwrap();
        p.update_ask_state(OrderState::Filled).unwrap();
        assert!(p.is_fully_filled());
        assert!(p.is_terminal());
        assert!(!p.is_active());
    }
}
