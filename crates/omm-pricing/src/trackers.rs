//! Rolling per-market market-state trackers.
//!
//! `VolTracker` keeps an EWMA of squared mid-price changes (in points);
//! `StaleTracker` scores how long the mid has sat unchanged. Both are
//! keyed by market id and take the caller's clock where time matters.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use omm_core::{MarketId, Price};

/// Realized volatility via EWMA of mid-price changes.
#[derive(Debug)]
pub struct VolTracker {
    /// EWMA smoothing factor derived from the half-life.
    alpha: Decimal,
    ewma_var: HashMap<MarketId, Decimal>,
    last_mid: HashMap<MarketId, Price>,
}

impl VolTracker {
    /// `halflife` is the observation count at which an observation's
    /// weight has decayed to one half.
    pub fn new(halflife: u32) -> Self {
        let hl = halflife.max(1) as f64;
        let alpha = 1.0 - 0.5_f64.powf(1.0 / hl);
        Self {
            alpha: Decimal::from_f64_retain(alpha).unwrap_or(dec!(0.05)),
            ewma_var: HashMap::new(),
            last_mid: HashMap::new(),
        }
    }

    /// Record a mid observation and return the updated vol estimate
    /// (EWMA standard deviation, in points).
    pub fn update(&mut self, market_id: &MarketId, mid: Price) -> Decimal {
        let last = self.last_mid.insert(market_id.clone(), mid);

        let Some(last) = last else {
            return Decimal::ZERO;
        };
        if !last.is_positive() || !mid.is_positive() {
            return Decimal::ZERO;
        }

        let change_pts = (mid.inner() - last.inner()) * dec!(100);
        let sq_change = change_pts * change_pts;

        let prev_var = self
            .ewma_var
            .get(market_id)
            .copied()
            .unwrap_or(sq_change);
        let new_var = self.alpha * sq_change + (Decimal::ONE - self.alpha) * prev_var;
        self.ewma_var.insert(market_id.clone(), new_var);

        decimal_sqrt(new_var)
    }

    /// Current vol estimate for a market, in points.
    pub fn vol(&self, market_id: &MarketId) -> Decimal {
        self.ewma_var
            .get(market_id)
            .copied()
            .map(decimal_sqrt)
            .unwrap_or(Decimal::ZERO)
    }

    /// Drop tracking for a market.
    pub fn reset(&mut self, market_id: &MarketId) {
        self.ewma_var.remove(market_id);
        self.last_mid.remove(market_id);
    }
}

/// Staleness score from elapsed time since the mid last moved.
#[derive(Debug)]
pub struct StaleTracker {
    threshold_ms: u64,
    last_mid: HashMap<MarketId, Price>,
    last_change_ms: HashMap<MarketId, u64>,
}

impl StaleTracker {
    pub fn new(threshold_seconds: u64) -> Self {
        Self {
            threshold_ms: threshold_seconds * 1000,
            last_mid: HashMap::new(),
            last_change_ms: HashMap::new(),
        }
    }

    /// Record a mid observation at `now_ms`; the change timestamp only
    /// advances when the mid actually moved.
    pub fn observe(&mut self, market_id: &MarketId, mid: Price, now_ms: u64) {
        let moved = match self.last_mid.get(market_id) {
            Some(prev) => *prev != mid,
            None => true,
        };
        self.last_mid.insert(market_id.clone(), mid);
        if moved || !self.last_change_ms.contains_key(market_id) {
            self.last_change_ms.insert(market_id.clone(), now_ms);
        }
    }

    /// Staleness on [0, 1]: 0 = fresh, 1 = at or beyond the threshold.
    pub fn staleness(&self, market_id: &MarketId, now_ms: u64) -> Decimal {
        let Some(&last) = self.last_change_ms.get(market_id) else {
            return Decimal::ZERO;
        };
        if self.threshold_ms == 0 {
            return Decimal::ZERO;
        }
        let elapsed = now_ms.saturating_sub(last);
        let ratio = Decimal::from(elapsed) / Decimal::from(self.threshold_ms);
        ratio.min(Decimal::ONE)
    }

    /// Drop tracking for a market.
    pub fn reset(&mut self, market_id: &MarketId) {
        self.last_mid.remove(market_id);
        self.last_change_ms.remove(market_id);
    }
}

/// Square root via f64; precision loss is far below a point.
fn decimal_sqrt(value: Decimal) -> Decimal {
    let v = value.to_f64().unwrap_or(0.0);
    Decimal::from_f64_retain(v.max(0.0).sqrt()).unwrap_or(Decimal::ZERO)
}
