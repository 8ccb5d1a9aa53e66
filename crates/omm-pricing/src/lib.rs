//! Pricing engines for the outcome market-making bot.
//!
//! Two interchangeable modes, selected per deployment:
//! - `heuristic`: dynamic half-spread from volatility, book imbalance and
//!   staleness, plus a non-linear inventory skew.
//! - `avellaneda`: Avellaneda-Stoikov reservation price and optimal spread
//!   from inventory risk aversion, volatility and order-arrival intensity.
//!
//! Pure math layer: no I/O, no suspension points. The only mutable state
//! lives in the rolling trackers (`VolTracker`, `StaleTracker`,
//! `KappaEstimator`), all of which take an injected clock so cycles stay
//! deterministic under test.

pub mod avellaneda;
pub mod heuristic;
pub mod kappa;
pub mod trackers;

pub use avellaneda::{
    compute_as_quotes, compute_optimal_spread, compute_reservation_price, dynamic_gamma,
    estimate_time_remaining, AsParams,
};
pub use heuristic::{
    compute_bid_ask, compute_dynamic_delta, compute_quote_size, compute_skew, should_requote,
    HeuristicParams,
};
pub use kappa::KappaEstimator;
pub use trackers::{StaleTracker, VolTracker};
