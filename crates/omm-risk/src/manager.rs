//! Quote validation gate and high-water-mark drawdown kill switch.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use omm_core::{Price, MAX_PRICE, MIN_PRICE};

/// Risk thresholds, all percentages on a 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Drawdown from peak that kills all MM activity.
    pub dd_kill_pct: Decimal,
    /// Drawdown that halves exposure (caller-side).
    pub dd_reduce_pct: Decimal,
    /// Drawdown must recover below this before auto-resume.
    /// Strictly lower than `dd_kill_pct` (hysteresis).
    pub dd_resume_pct: Decimal,
    /// Minimum minutes between kill and auto-resume.
    pub dd_cooldown_minutes: i64,
    /// Auto-recoveries allowed per UTC day.
    pub dd_max_recoveries_per_day: u32,
    /// Absolute cap on quoted spread, in points.
    pub max_spread_pts: Decimal,
    /// Total exposure cap as a percentage of portfolio.
    pub max_total_exposure_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            dd_kill_pct: dec!(25),
            dd_reduce_pct: dec!(15),
            dd_resume_pct: dec!(20),
            dd_cooldown_minutes: 30,
            dd_max_recoveries_per_day: 3,
            max_spread_pts: dec!(12),
            max_total_exposure_pct: dec!(80),
        }
    }
}

/// Why a quote was refused by the validation gate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteReject {
    #[error("trading paused")]
    Paused,

    #[error("crossed quote: bid {bid} >= ask {ask}")]
    Crossed { bid: Price, ask: Price },

    #[error("quote out of range: bid {bid}, ask {ask}")]
    OutOfRange { bid: Price, ask: Price },

    #[error("spread too wide: {spread_pts}pts > {max_pts}pts")]
    SpreadTooWide {
        spread_pts: Decimal,
        max_pts: Decimal,
    },

    #[error("side too far from mid: bid {bid_delta_pts}pts / ask {ask_delta_pts}pts, cap {cap_pts}pts")]
    DeltaTooWide {
        bid_delta_pts: Decimal,
        ask_delta_pts: Decimal,
        cap_pts: Decimal,
    },

    #[error("spread too tight: {spread_pts}pts < 1pt minimum")]
    SpreadTooTight { spread_pts: Decimal },
}

/// Drawdown regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMode {
    /// Normal operation.
    Ok,
    /// Exposure should be halved by the caller.
    Reduce,
    /// All MM activity stopped.
    Kill,
}

/// Inventory utilization verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryRisk {
    Ok,
    /// Above 90% of capacity; still quotable.
    NearCapacity { utilization: Decimal },
    /// Over capacity; the side growing inventory must be skipped.
    Exceeded {
        net_inventory: Decimal,
        max_inventory: Decimal,
    },
}

/// Process-lifetime risk state: pause flag, risk mode, high-water mark,
/// kill timestamp and the daily auto-recovery counter.
#[derive(Debug)]
pub struct RiskManager {
    config: RiskConfig,
    paused: bool,
    risk_mode: RiskMode,
    high_water_mark: Decimal,
    kill_triggered_at: Option<DateTime<Utc>>,
    auto_recoveries_today: u32,
    auto_recovery_date: Option<NaiveDate>,
    // Log throttles: emit on transition only.
    kill_logged: bool,
    reduce_logged: bool,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            paused: false,
            risk_mode: RiskMode::Ok,
            high_water_mark: Decimal::ZERO,
            kill_triggered_at: None,
            auto_recoveries_today: 0,
            auto_recovery_date: None,
            kill_logged: false,
            reduce_logged: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn risk_mode(&self) -> RiskMode {
        self.risk_mode
    }

    pub fn high_water_mark(&self) -> Decimal {
        self.high_water_mark
    }

    /// Seed the high-water mark from the persisted store at startup.
    pub fn restore_high_water_mark(&mut self, peak_value: Decimal) {
        self.high_water_mark = self.high_water_mark.max(peak_value);
    }

    /// Pause trading (operator command).
    pub fn pause(&mut self) {
        self.paused = true;
        info!("trading paused via command");
    }

    /// Manually resume after a stop. Clears the kill latch.
    pub fn resume_manual(&mut self) {
        self.paused = false;
        self.kill_triggered_at = None;
        self.kill_logged = false;
        self.reduce_logged = false;
        info!("trading resumed manually");
    }

    /// Validate a quote before placement.
    ///
    /// Rejects when paused, crossed, out of the quotable range, spread
    /// outside [1pt, min(2*max_delta+1, configured max)], or either side
    /// farther than `2 * max_delta` points from mid. The per-side cap is
    /// independent of the spread check so an asymmetric skew cannot park
    /// one side arbitrarily far away.
    pub fn validate_mm_quote(
        &self,
        bid: Price,
        ask: Price,
        mid: Price,
        max_delta_pts: Decimal,
    ) -> Result<(), QuoteReject> {
        if self.paused {
            return Err(QuoteReject::Paused);
        }

        if bid >= ask {
            return Err(QuoteReject::Crossed { bid, ask });
        }

        if bid.inner() < MIN_PRICE || ask.inner() > MAX_PRICE {
            return Err(QuoteReject::OutOfRange { bid, ask });
        }

        let spread_pts = ask.distance_points(bid);
        let max_spread = (Decimal::TWO * max_delta_pts + Decimal::ONE).min(self.config.max_spread_pts);
        if spread_pts > max_spread {
            return Err(QuoteReject::SpreadTooWide {
                spread_pts,
                max_pts: max_spread,
            });
        }

        let bid_delta = mid.distance_points(bid);
        let ask_delta = ask.distance_points(mid);
        let hard_cap = max_delta_pts * Decimal::TWO;
        if bid_delta > hard_cap || ask_delta > hard_cap {
            return Err(QuoteReject::DeltaTooWide {
                bid_delta_pts: bid_delta,
                ask_delta_pts: ask_delta,
                cap_pts: hard_cap,
            });
        }

        if spread_pts < Decimal::ONE {
            return Err(QuoteReject::SpreadTooTight { spread_pts });
        }

        Ok(())
    }

    /// Drawdown check against the high-water mark.
    ///
    /// Raises the HWM when `portfolio_value` makes a new peak, then maps
    /// the drawdown onto a mode: kill pauses trading and latches the kill
    /// timestamp, reduce tells the caller to halve exposure. Transition
    /// log lines are emitted once per episode, not per cycle.
    pub fn check_intraday_dd(
        &mut self,
        portfolio_value: Decimal,
        now: DateTime<Utc>,
    ) -> RiskMode {
        self.high_water_mark = self.high_water_mark.max(portfolio_value);
        let peak = self.high_water_mark;
        let dd_pct = if peak > Decimal::ZERO {
            (peak - portfolio_value) / peak * dec!(100)
        } else {
            Decimal::ZERO
        };

        if dd_pct >= self.config.dd_kill_pct {
            self.paused = true;
            if self.kill_triggered_at.is_none() {
                self.kill_triggered_at = Some(now);
            }
            if !self.kill_logged {
                error!(
                    dd_pct = %dd_pct.round_dp(1),
                    kill_pct = %self.config.dd_kill_pct,
                    peak = %peak,
                    current = %portfolio_value,
                    "MM kill switch engaged"
                );
                self.kill_logged = true;
            }
            self.risk_mode = RiskMode::Kill;
            return RiskMode::Kill;
        }

        if dd_pct >= self.config.dd_reduce_pct {
            if !self.reduce_logged {
                warn!(
                    dd_pct = %dd_pct.round_dp(1),
                    reduce_pct = %self.config.dd_reduce_pct,
                    peak = %peak,
                    "MM exposure reduction engaged"
                );
                self.reduce_logged = true;
            }
            self.risk_mode = RiskMode::Reduce;
            return RiskMode::Reduce;
        }

        self.kill_logged = false;
        self.reduce_logged = false;
        self.risk_mode = RiskMode::Ok;
        RiskMode::Ok
    }

    /// Attempt auto-resume after a kill, with hysteresis.
    ///
    /// Resumes only when all of: the pause came from the kill switch
    /// (not an operator), drawdown recovered below the resume threshold,
    /// the cooldown elapsed, and the per-day recovery cap (reset at the
    /// UTC day boundary) is not exhausted.
    pub fn try_auto_resume(&mut self, portfolio_value: Decimal, now: DateTime<Utc>) -> bool {
        if !self.paused {
            return false;
        }
        let Some(killed_at) = self.kill_triggered_at else {
            return false;
        };

        let peak = self.high_water_mark;
        let dd_pct = if peak > Decimal::ZERO {
            (peak - portfolio_value) / peak * dec!(100)
        } else {
            Decimal::ZERO
        };
        if dd_pct >= self.config.dd_resume_pct {
            return false;
        }

        let elapsed = now - killed_at;
        if elapsed.num_minutes() < self.config.dd_cooldown_minutes {
            return false;
        }

        let today = now.date_naive();
        if self.auto_recovery_date != Some(today) {
            self.auto_recoveries_today = 0;
            self.auto_recovery_date = Some(today);
        }
        if self.auto_recoveries_today >= self.config.dd_max_recoveries_per_day {
            return false;
        }

        self.paused = false;
        self.auto_recoveries_today += 1;
        self.kill_triggered_at = None;
        self.kill_logged = false;
        self.reduce_logged = false;
        info!(
            dd_pct = %dd_pct.round_dp(1),
            resume_pct = %self.config.dd_resume_pct,
            cooldown_min = elapsed.num_minutes(),
            recovery = self.auto_recoveries_today,
            "MM auto-resume"
        );
        true
    }

    /// Inventory utilization check for one market.
    pub fn check_inventory_risk(
        &self,
        net_inventory: Decimal,
        max_inventory: Decimal,
    ) -> InventoryRisk {
        if net_inventory.abs() > max_inventory {
            return InventoryRisk::Exceeded {
                net_inventory,
                max_inventory,
            };
        }
        let utilization = if max_inventory > Decimal::ZERO {
            net_inventory.abs() / max_inventory
        } else {
            Decimal::ZERO
        };
        if utilization > dec!(0.9) {
            return InventoryRisk::NearCapacity { utilization };
        }
        InventoryRisk::Ok
    }

    /// Total exposure against the portfolio cap.
    ///
    /// The denominator is the whole portfolio (cash + positions) so the
    /// ratio stays stable as capital moves from cash into positions.
    /// Returns `(within_limit, exposure_pct)`.
    pub fn check_global_exposure(
        &self,
        onchain_balance: Decimal,
        total_exposure: Decimal,
    ) -> (bool, Decimal) {
        if onchain_balance <= Decimal::ZERO {
            return (true, Decimal::ZERO);
        }
        let portfolio = onchain_balance + total_exposure;
        let exposure_pct = if portfolio > Decimal::ZERO {
            total_exposure / portfolio * dec!(100)
        } else {
            Decimal::ZERO
        };
        (
            exposure_pct <= self.config.max_total_exposure_pct,
            exposure_pct.round_dp(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default())
    }

    fn price(v: Decimal) -> Price {
        Price::new(v)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_quote_passes() {
        let m = manager();
        assert!(m
            .validate_mm_quote(price(dec!(0.48)), price(dec!(0.52)), price(dec!(0.50)), dec!(4))
            .is_ok());
    }

    #[test]
    fn test_paused_rejects_everything() {
        let mut m = manager();
        m.pause();
        let err = m
            .validate_mm_quote(price(dec!(0.48)), price(dec!(0.52)), price(dec!(0.50)), dec!(4))
            .unwrap_err();
        assert_eq!(err, QuoteReject::Paused);
    }

    #[test]
    fn test_crossed_quote_rejected() {
        let m = manager();
        let err = m
            .validate_mm_quote(price(dec!(0.52)), price(dec!(0.48)), price(dec!(0.50)), dec!(4))
            .unwrap_err();
        assert!(matches!(err, QuoteReject::Crossed { .. }));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let m = manager();
        let err = m
            .validate_mm_quote(price(dec!(0.005)), price(dec!(0.52)), price(dec!(0.50)), dec!(4))
            .unwrap_err();
        assert!(matches!(err, QuoteReject::OutOfRange { .. }));
    }

    #[test]
    fn test_spread_too_wide_rejected() {
        let m = manager();
        // max_delta 2: cap = min(2*2+1, 12) = 5pts; spread here is 10pts.
        let err = m
            .validate_mm_quote(price(dec!(0.45)), price(dec!(0.55)), price(dec!(0.50)), dec!(2))
            .unwrap_err();
        assert!(matches!(err, QuoteReject::SpreadTooWide { .. }));
    }

    #[test]
    fn test_asymmetric_side_cap() {
        let m = manager();
        // Spread 5pts fits under min(2*8+1, 12), but the bid sits 16.5pts
        // below mid, past the 2*8 = 16pt per-side cap.
        let err = m
            .validate_mm_quote(
                price(dec!(0.335)),
                price(dec!(0.385)),
                price(dec!(0.50)),
                dec!(8),
            )
            .unwrap_err();
        assert!(matches!(err, QuoteReject::DeltaTooWide { .. }));
    }

    #[test]
    fn test_spread_too_tight_rejected() {
        let m = manager();
        let err = m
            .validate_mm_quote(
                price(dec!(0.495)),
                price(dec!(0.5)),
                price(dec!(0.4975)),
                dec!(4),
            )
            .unwrap_err();
        assert!(matches!(err, QuoteReject::SpreadTooTight { .. }));
    }

    #[test]
    fn test_kill_at_threshold() {
        let mut m = manager();
        assert_eq!(m.check_intraday_dd(dec!(100), t0()), RiskMode::Ok);
        // 100 -> 74: 26% >= 25% kill threshold.
        assert_eq!(m.check_intraday_dd(dec!(74), t0()), RiskMode::Kill);
        assert!(m.is_paused());
        assert_eq!(m.risk_mode(), RiskMode::Kill);
    }

    #[test]
    fn test_reduce_band() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        // 18% drawdown: reduce, not kill.
        assert_eq!(m.check_intraday_dd(dec!(82), t0()), RiskMode::Reduce);
        assert!(!m.is_paused());
    }

    #[test]
    fn test_hwm_ratchets_up() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        m.check_intraday_dd(dec!(120), t0());
        assert_eq!(m.high_water_mark(), dec!(120));
        // 96 is 20% off the new 120 peak: reduce.
        assert_eq!(m.check_intraday_dd(dec!(96), t0()), RiskMode::Reduce);
    }

    #[test]
    fn test_auto_resume_happy_path() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        m.check_intraday_dd(dec!(74), t0());
        assert!(m.is_paused());

        let after_cooldown = t0() + Duration::minutes(31);
        // Recovered to 81: dd 19% < 20% resume threshold.
        assert!(m.try_auto_resume(dec!(81), after_cooldown));
        assert!(!m.is_paused());

        // Second call is a no-op: kill latch was cleared.
        assert!(!m.try_auto_resume(dec!(81), after_cooldown));
    }

    #[test]
    fn test_auto_resume_blocked_by_hysteresis() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        m.check_intraday_dd(dec!(74), t0());

        let after_cooldown = t0() + Duration::minutes(31);
        // 78: dd 22%, above the 20% resume threshold even though it is
        // below the 25% kill threshold. Stay down (hysteresis).
        assert!(!m.try_auto_resume(dec!(78), after_cooldown));
        assert!(m.is_paused());
    }

    #[test]
    fn test_auto_resume_blocked_by_cooldown() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        m.check_intraday_dd(dec!(74), t0());

        let too_soon = t0() + Duration::minutes(10);
        assert!(!m.try_auto_resume(dec!(85), too_soon));
    }

    #[test]
    fn test_auto_resume_daily_cap() {
        let mut m = RiskManager::new(RiskConfig {
            dd_max_recoveries_per_day: 1,
            ..RiskConfig::default()
        });
        m.check_intraday_dd(dec!(100), t0());

        // First kill-recover cycle.
        m.check_intraday_dd(dec!(74), t0());
        assert!(m.try_auto_resume(dec!(85), t0() + Duration::minutes(31)));

        // Second cycle the same day: blocked by the cap.
        let later = t0() + Duration::hours(2);
        m.check_intraday_dd(dec!(74), later);
        assert!(!m.try_auto_resume(dec!(85), later + Duration::minutes(31)));
        assert!(m.is_paused());

        // Next UTC day the counter resets.
        let next_day = t0() + Duration::days(1);
        assert!(m.try_auto_resume(dec!(85), next_day));
    }

    #[test]
    fn test_manual_pause_never_auto_resumes() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        m.pause();
        // Paused without a kill latch: auto-resume refuses.
        assert!(!m.try_auto_resume(dec!(100), t0() + Duration::hours(1)));
        m.resume_manual();
        assert!(!m.is_paused());
    }

    #[test]
    fn test_log_throttle_resets_on_recovery() {
        let mut m = manager();
        m.check_intraday_dd(dec!(100), t0());
        m.check_intraday_dd(dec!(82), t0());
        assert_eq!(m.risk_mode(), RiskMode::Reduce);
        m.check_intraday_dd(dec!(99), t0());
        assert_eq!(m.risk_mode(), RiskMode::Ok);
        // A second reduce episode logs again (flag was reset).
        assert_eq!(m.check_intraday_dd(dec!(82), t0()), RiskMode::Reduce);
    }

    #[test]
    fn test_inventory_risk_bands() {
        let m = manager();
        assert_eq!(m.check_inventory_risk(dec!(50), dec!(100)), InventoryRisk::Ok);
        assert!(matches!(
            m.check_inventory_risk(dec!(95), dec!(100)),
            InventoryRisk::NearCapacity { .. }
        ));
        assert!(matches!(
            m.check_inventory_risk(dec!(-120), dec!(100)),
            InventoryRisk::Exceeded { .. }
        ));
    }

    #[test]
    fn test_global_exposure() {
        let m = manager();
        // 50 exposure over 100+50 portfolio = 33.3%.
        let (ok, pct) = m.check_global_exposure(dec!(100), dec!(50));
        assert!(ok);
        assert_eq!(pct, dec!(33.3));

        // 900 exposure over 1000 portfolio = 90% > 80% cap.
        let (ok, _) = m.check_global_exposure(dec!(100), dec!(900));
        assert!(!ok);

        let (ok, pct) = m.check_global_exposure(dec!(0), dec!(900));
        assert!(ok);
        assert_eq!(pct, dec!(0));
    }
}
