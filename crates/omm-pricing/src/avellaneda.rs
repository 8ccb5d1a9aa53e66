//! Avellaneda-Stoikov pricing.
//!
//! Reference: Avellaneda & Stoikov (2008), "High-frequency trading in a
//! limit order book", Quantitative Finance, 8(3), 217-224.
//!
//! Core equations:
//!   reservation price: r = mid - q * gamma * sigma^2 * T
//!   optimal spread:    s = gamma * sigma^2 * T + (2/gamma) * ln(1 + gamma/kappa)
//!   dynamic gamma:     gamma = gamma_base * (1 + alpha * |q|)
//!
//! Pure math layer. Volatility arrives in points and is converted to price
//! units internally; the logarithm goes through f64 where the precision
//! loss is well below a tick.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use omm_core::{Price, TICK};

/// Parameters for the Avellaneda-Stoikov model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsParams {
    /// Base risk aversion.
    pub gamma_base: Decimal,
    /// Inventory-dependent gamma scaling.
    pub gamma_alpha: Decimal,
    /// Order-arrival intensity used when no fill data is available.
    pub kappa: Decimal,
    /// Minimum spread in points.
    pub min_spread_pts: Decimal,
    /// Maximum spread in points.
    pub max_spread_pts: Decimal,
}

impl Default for AsParams {
    fn default() -> Self {
        Self {
            gamma_base: dec!(0.1),
            gamma_alpha: dec!(0.5),
            kappa: dec!(1.5),
            min_spread_pts: dec!(1.0),
            max_spread_pts: dec!(15.0),
        }
    }
}

/// `ln(x)` for Decimal via f64. Fine for the spread's arrival term.
fn decimal_ln(x: Decimal) -> Decimal {
    let v = x.to_f64().unwrap_or(1.0);
    Decimal::from_f64_retain(v.ln()).unwrap_or(Decimal::ZERO)
}

/// Inventory-adaptive risk aversion.
///
/// Larger inventory raises gamma, widening spreads and pushing harder
/// toward unwind.
pub fn dynamic_gamma(gamma_base: Decimal, alpha: Decimal, inventory_ratio: Decimal) -> Decimal {
    gamma_base * (Decimal::ONE + alpha * inventory_ratio.abs())
}

/// Reservation (indifference) price.
///
/// `r = mid - q * gamma * sigma^2 * T` with q the normalized inventory
/// ratio and sigma in price units. A long position lowers the reservation
/// price, incentivizing sells.
pub fn compute_reservation_price(
    mid: Price,
    inventory: Decimal,
    max_inventory: Decimal,
    gamma: Decimal,
    vol_pts: Decimal,
    time_remaining: Decimal,
) -> Price {
    if max_inventory <= Decimal::ZERO {
        return mid;
    }
    let q = inventory / max_inventory;
    let sigma = vol_pts / dec!(100);
    Price::new(mid.inner() - q * gamma * sigma * sigma * time_remaining)
}

/// Optimal spread in price units.
///
/// `s = gamma * sigma^2 * T + (2/gamma) * ln(1 + gamma/kappa)`
///
/// Degenerate parameters fall back to a 2-point spread.
pub fn compute_optimal_spread(
    gamma: Decimal,
    vol_pts: Decimal,
    time_remaining: Decimal,
    kappa: Decimal,
) -> Decimal {
    if gamma <= Decimal::ZERO || kappa <= Decimal::ZERO {
        return dec!(0.02);
    }
    let sigma = vol_pts / dec!(100);
    let inventory_component = gamma * sigma * sigma * time_remaining;
    let arrival_component = (Decimal::TWO / gamma) * decimal_ln(Decimal::ONE + gamma / kappa);
    inventory_component + arrival_component
}

/// Full AS quoting pipeline: gamma -> reservation -> spread -> bid/ask.
///
/// The spread is clamped to the configured point bounds. When inventory is
/// long, the ask is floored at `avg_entry + 1 tick` so the unwind quote
/// never realizes a loss. Both sides end up on [0.01, 0.99], tick-rounded
/// and re-separated if they collapse.
pub fn compute_as_quotes(
    mid: Price,
    inventory: Decimal,
    max_inventory: Decimal,
    vol_pts: Decimal,
    time_remaining: Decimal,
    params: &AsParams,
    avg_entry_price: Option<Price>,
) -> (Price, Price) {
    let inv_ratio = if max_inventory > Decimal::ZERO {
        inventory / max_inventory
    } else {
        Decimal::ZERO
    };
    let gamma = dynamic_gamma(params.gamma_base, params.gamma_alpha, inv_ratio);

    let reservation = compute_reservation_price(
        mid,
        inventory,
        max_inventory,
        gamma,
        vol_pts,
        time_remaining,
    );

    let raw_spread = compute_optimal_spread(gamma, vol_pts, time_remaining, params.kappa);
    let spread_pts = (raw_spread * dec!(100))
        .max(params.min_spread_pts)
        .min(params.max_spread_pts);
    let half = Price::from_points(spread_pts / Decimal::TWO);

    let bid = reservation - half;
    let mut ask = reservation + half;

    // Never quote a loss-realizing unwind while long.
    if inventory > Decimal::ZERO {
        if let Some(entry) = avg_entry_price {
            if entry.is_positive() {
                ask = ask.max(Price::new(entry.inner() + TICK));
            }
        }
    }

    let mut bid = bid.clamp_quotable().round_to_tick();
    let mut ask = ask.clamp_quotable().round_to_tick();

    if bid >= ask {
        let center = Price::new((bid.inner() + ask.inner()) / Decimal::TWO);
        bid = Price::new(center.inner() - TICK).clamp_quotable().round_to_tick();
        ask = Price::new(center.inner() + TICK).clamp_quotable().round_to_tick();
    }

    (bid, ask)
}

/// Normalize days to resolution into T on (0, 1].
///
/// At `max_days` (default 30) and beyond, T = 1. Near-resolution markets
/// get a small positive T rather than zero so spreads never fully
/// collapse.
pub fn estimate_time_remaining(days_to_resolution: Decimal, max_days: Decimal) -> Decimal {
    if days_to_resolution <= Decimal::ZERO {
        return dec!(0.01);
    }
    (days_to_resolution / max_days).min(Decimal::ONE)
}
