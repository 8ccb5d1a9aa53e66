//! Observed order-book summary.
//!
//! The venue owns the book; this is a read-only top-of-book snapshot used
//! for pricing. The depth-weighted mid leans toward the heavier side of the
//! book, reflecting where the tradeable price likely sits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Price;

/// Top-of-book summary for one outcome token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    pub best_bid: Price,
    pub best_ask: Price,
    /// Total bid size within the top levels, in shares.
    pub bid_depth: Decimal,
    /// Total ask size within the top levels, in shares.
    pub ask_depth: Decimal,
    pub received_at: DateTime<Utc>,
}

impl BookSummary {
    pub fn new(best_bid: Price, best_ask: Price, bid_depth: Decimal, ask_depth: Decimal) -> Self {
        Self {
            best_bid,
            best_ask,
            bid_depth,
            ask_depth,
            received_at: Utc::now(),
        }
    }

    /// Both sides present and uncrossed.
    pub fn is_valid(&self) -> bool {
        self.best_bid.is_positive()
            && self.best_ask.is_positive()
            && self.best_bid.inner() < self.best_ask.inner()
    }

    /// Simple midpoint. `None` when the book is one-sided or crossed.
    pub fn mid(&self) -> Option<Price> {
        if !self.is_valid() {
            return None;
        }
        Some(Price::new(
            (self.best_bid.inner() + self.best_ask.inner()) / Decimal::TWO,
        ))
    }

    /// Depth-weighted mid.
    ///
    /// More ask depth pulls the mid toward the bid and vice versa. Falls
    /// back to the simple midpoint when depth is empty; `None` when the
    /// book is invalid.
    pub fn weighted_mid(&self) -> Option<Price> {
        if !self.is_valid() {
            return None;
        }
        let total_depth = self.bid_depth + self.ask_depth;
        if total_depth <= Decimal::ZERO {
            return self.mid();
        }
        let w_bid = self.ask_depth / total_depth;
        let w_ask = self.bid_depth / total_depth;
        Some(Price::new(
            w_bid * self.best_bid.inner() + w_ask * self.best_ask.inner(),
        ))
    }

    /// Book imbalance in [-1, 1]: positive when bids dominate.
    pub fn imbalance(&self) -> Decimal {
        let total = self.bid_depth + self.ask_depth;
        if total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.bid_depth - self.ask_depth) / total
    }

    /// Observed spread: best_ask - best_bid.
    pub fn spread(&self) -> Price {
        self.best_ask - self.best_bid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(bid: Decimal, ask: Decimal, bd: Decimal, ad: Decimal) -> BookSummary {
        BookSummary::new(Price::new(bid), Price::new(ask), bd, ad)
    }

    #[test]
    fn test_mid_balanced() {
        let b = book(dec!(0.48), dec!(0.52), dec!(100), dec!(100));
        assert_eq!(b.mid().unwrap().inner(), dec!(0.50));
        assert_eq!(b.weighted_mid().unwrap().inner(), dec!(0.50));
    }

    #[test]
    fn test_weighted_mid_leans_to_heavy_side() {
        // Heavy bids push the weighted mid toward the ask.
        let b = book(dec!(0.48), dec!(0.52), dec!(300), dec!(100));
        let wm = b.weighted_mid().unwrap().inner();
        assert!(wm > dec!(0.50));
        // w_bid = 100/400 = 0.25, w_ask = 300/400 = 0.75
        // wm = 0.25*0.48 + 0.75*0.52 = 0.12 + 0.39 = 0.51
        assert_eq!(wm, dec!(0.51));
    }

    #[test]
    fn test_empty_depth_falls_back_to_mid() {
        let b = book(dec!(0.40), dec!(0.60), dec!(0), dec!(0));
        assert_eq!(b.weighted_mid().unwrap().inner(), dec!(0.50));
    }

    #[test]
    fn test_crossed_book_invalid() {
        let b = book(dec!(0.55), dec!(0.50), dec!(10), dec!(10));
        assert!(!b.is_valid());
        assert!(b.mid().is_none());
        assert!(b.weighted_mid().is_none());
    }

    #[test]
    fn test_one_sided_book_invalid() {
        let b = book(dec!(0), dec!(0.50), dec!(0), dec!(10));
        assert!(!b.is_valid());
        assert!(b.weighted_mid().is_none());
    }

    #[test]
    fn test_imbalance() {
        let b = book(dec!(0.48), dec!(0.52), dec!(300), dec!(100));
        assert_eq!(b.imbalance(), dec!(0.5));
        let flat = book(dec!(0.48), dec!(0.52), dec!(0), dec!(0));
        assert_eq!(flat.imbalance(), dec!(0));
    }
}
