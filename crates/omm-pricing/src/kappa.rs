//! Order-arrival intensity (kappa) estimation from observed fill rates.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use omm_core::MarketId;

/// Estimate kappa from fills per market over a rolling time window.
///
/// Higher fill rate implies higher kappa, which makes tighter AS spreads
/// viable. The estimate is the fill rate per minute, clamped to
/// [0.5, 10.0]; below two fills in the window the configured default is
/// returned. Timestamps are caller-supplied milliseconds so tests stay
/// deterministic.
#[derive(Debug)]
pub struct KappaEstimator {
    window_ms: u64,
    default_kappa: Decimal,
    fills: HashMap<MarketId, VecDeque<u64>>,
}

impl KappaEstimator {
    pub fn new(window_minutes: u64, default_kappa: Decimal) -> Self {
        Self {
            window_ms: window_minutes * 60_000,
            default_kappa,
            fills: HashMap::new(),
        }
    }

    /// Record a fill at `now_ms`, evicting entries older than the window.
    pub fn record_fill(&mut self, market_id: &MarketId, now_ms: u64) {
        let fills = self.fills.entry(market_id.clone()).or_default();
        fills.push_back(now_ms);
        let cutoff = now_ms.saturating_sub(self.window_ms);
        while fills.front().is_some_and(|&t| t < cutoff) {
            fills.pop_front();
        }
    }

    /// Estimated kappa for a market at `now_ms`.
    pub fn kappa(&self, market_id: &MarketId, now_ms: u64) -> Decimal {
        let Some(fills) = self.fills.get(market_id) else {
            return self.default_kappa;
        };
        let cutoff = now_ms.saturating_sub(self.window_ms);
        let recent: Vec<u64> = fills.iter().copied().filter(|&t| t >= cutoff).collect();
        if recent.len() < 2 {
            return self.default_kappa;
        }
        let span_ms = recent[recent.len() - 1] - recent[0];
        if span_ms == 0 {
            return self.default_kappa;
        }
        // rate per minute: (n - 1) fills over the observed span
        let intervals = Decimal::from(recent.len() as u64 - 1);
        let span_min = Decimal::from(span_ms) / dec!(60000);
        let rate_per_min = intervals / span_min;
        rate_per_min.max(dec!(0.5)).min(dec!(10.0))
    }

    /// Clear fill history for a market.
    pub fn reset(&mut self, market_id: &MarketId) {
        self.fills.remove(market_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkt() -> MarketId {
        MarketId::new("mkt-1")
    }

    fn estimator() -> KappaEstimator {
        KappaEstimator::new(60, dec!(1.5))
    }

    #[test]
    fn test_default_without_fills() {
        let est = estimator();
        assert_eq!(est.kappa(&mkt(), 1_000_000), dec!(1.5));
    }

    #[test]
    fn test_default_with_single_fill() {
        let mut est = estimator();
        est.record_fill(&mkt(), 1_000);
        assert_eq!(est.kappa(&mkt(), 2_000), dec!(1.5));
    }

    #[test]
    fn test_rate_per_minute() {
        let mut est = estimator();
        // 3 fills over 2 minutes: 2 intervals / 2 min = 1 fill/min.
        est.record_fill(&mkt(), 0);
        est.record_fill(&mkt(), 60_000);
        est.record_fill(&mkt(), 120_000);
        assert_eq!(est.kappa(&mkt(), 120_000), dec!(1));
    }

    #[test]
    fn test_rate_clamped_high() {
        let mut est = estimator();
        // Burst of fills one second apart: 60/min, clamped to 10.
        for i in 0..5u64 {
            est.record_fill(&mkt(), i * 1_000);
        }
        assert_eq!(est.kappa(&mkt(), 5_000), dec!(10.0));
    }

    #[test]
    fn test_rate_clamped_low() {
        let mut est = KappaEstimator::new(600, dec!(1.5));
        // 2 fills 100 minutes apart: 0.01/min, clamped to 0.5.
        est.record_fill(&mkt(), 0);
        est.record_fill(&mkt(), 6_000_000);
        assert_eq!(est.kappa(&mkt(), 6_000_000), dec!(0.5));
    }

    #[test]
    fn test_old_fills_evicted() {
        let mut est = estimator();
        est.record_fill(&mkt(), 0);
        est.record_fill(&mkt(), 30_000);
        // Two hours later both fills fall out of the window.
        est.record_fill(&mkt(), 7_200_000);
        assert_eq!(est.kappa(&mkt(), 7_200_000), dec!(1.5));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut est = estimator();
        est.record_fill(&mkt(), 0);
        est.record_fill(&mkt(), 60_000);
        est.reset(&mkt());
        assert_eq!(est.kappa(&mkt(), 60_000), dec!(1.5));
    }
}
