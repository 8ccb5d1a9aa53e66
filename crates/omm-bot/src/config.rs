//! Application configuration.

use crate::error::{AppError, AppResult};
use omm_core::{ConditionId, MarketId, Price, Size, TokenId};
use omm_pricing::{AsParams, HeuristicParams};
use omm_risk::RiskConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Quote against the built-in paper venue; no external calls.
    #[default]
    Paper,
    /// Live trading against a real CLOB connector.
    Live,
}

/// Which pricing engine drives the quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    /// Weighted heuristic delta/skew model.
    #[default]
    Heuristic,
    /// Avellaneda-Stoikov reservation-price model.
    Avellaneda,
}

/// One market to quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub market_id: MarketId,
    /// YES outcome token.
    pub token_id: TokenId,
    /// NO outcome token; required for split/merge.
    #[serde(default)]
    pub no_token_id: Option<TokenId>,
    /// Condition identifier for split/merge settlement calls.
    #[serde(default)]
    pub condition_id: Option<ConditionId>,
    /// Days until the market resolves; feeds the AS time horizon.
    #[serde(default = "default_days_to_resolution")]
    pub days_to_resolution: Decimal,
    /// Starting mid for the paper venue.
    #[serde(default = "default_paper_mid")]
    pub paper_mid: Decimal,
}

fn default_days_to_resolution() -> Decimal {
    dec!(30)
}

fn default_paper_mid() -> Decimal {
    dec!(0.50)
}

/// Market-making loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MmConfig {
    /// Seconds between quoting cycles.
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: u64,
    /// Reject instead of crossing the book on placement.
    #[serde(default = "default_post_only")]
    pub post_only: bool,
    /// Base quote size per side (USDC).
    #[serde(default = "default_quote_size_usd")]
    pub quote_size_usd: Decimal,
    /// Inventory capacity per market (USDC notional).
    #[serde(default = "default_max_per_market_usd")]
    pub max_per_market_usd: Decimal,
    /// Smallest placeable order (shares).
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,
    /// Mid move that triggers a requote, in points.
    #[serde(default = "default_requote_threshold_pts")]
    pub requote_threshold_pts: Decimal,
    /// Quotes younger than this are never cancelled for a requote.
    #[serde(default = "default_min_quote_lifetime_seconds")]
    pub min_quote_lifetime_seconds: u64,
    /// Seconds without a mid change before a market counts as stale.
    #[serde(default = "default_stale_threshold_seconds")]
    pub stale_threshold_seconds: u64,
    /// EWMA halflife for the volatility tracker, in observations.
    #[serde(default = "default_vol_halflife")]
    pub vol_halflife: u32,
    /// Volatility above this widens proposal spreads, in points.
    #[serde(default = "default_vol_widen_threshold_pts")]
    pub vol_widen_threshold_pts: Decimal,
    /// Ladder levels per side.
    #[serde(default = "default_levels")]
    pub levels: u32,
    /// Per-level spread widening multiplier.
    #[serde(default = "default_level_spread_mult")]
    pub level_spread_mult: Decimal,
    /// Per-level size multiplier.
    #[serde(default = "default_level_size_mult")]
    pub level_size_mult: Decimal,
    /// Quote both sides, splitting collateral for ask inventory.
    #[serde(default = "default_two_sided")]
    pub two_sided: bool,
    /// Allow split/merge settlement calls.
    #[serde(default = "default_use_split_merge")]
    pub use_split_merge: bool,
    /// Collateral split per two-sided bootstrap (USDC).
    #[serde(default = "default_split_size_usd")]
    pub split_size_usd: Decimal,
    /// Merge back to collateral once this many pairs accumulate.
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: Decimal,
    /// Cycles between merge sweeps.
    #[serde(default = "default_merge_interval_cycles")]
    pub merge_interval_cycles: u64,
    /// Cycles between inventory reconciliation against the store.
    #[serde(default = "default_reconcile_interval_cycles")]
    pub reconcile_interval_cycles: u64,
    /// Position age at which unwind urgency saturates.
    #[serde(default = "default_max_position_age_hours")]
    pub max_position_age_hours: Decimal,
    /// Extra skew added per unit of unwind urgency.
    #[serde(default = "default_urgency_skew_bonus")]
    pub urgency_skew_bonus: Decimal,
    /// Fill window for the arrival-intensity estimator, in minutes.
    #[serde(default = "default_kappa_window_minutes")]
    pub kappa_window_minutes: u64,
    /// Spread widening applied on an advisory event-risk signal, percent.
    #[serde(default = "default_event_widen_pct")]
    pub event_widen_pct: Decimal,
    /// Horizon normalization cap for the AS model, in days.
    #[serde(default = "default_max_days_to_resolution")]
    pub max_days_to_resolution: Decimal,
    /// Concurrent book fetches per cycle.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
    /// Cross rejects before a market cools down.
    #[serde(default = "default_cross_reject_threshold")]
    pub cross_reject_threshold: u32,
    /// Base cross-reject cooldown, seconds.
    #[serde(default = "default_cross_cooldown_seconds")]
    pub cross_cooldown_seconds: i64,
    /// Cross-reject cooldown ceiling, seconds.
    #[serde(default = "default_cross_cooldown_max_seconds")]
    pub cross_cooldown_max_seconds: i64,
    /// Consecutive errors before a market's circuit breaker opens.
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker cooldown, seconds.
    #[serde(default = "default_circuit_breaker_cooldown_seconds")]
    pub circuit_breaker_cooldown_seconds: i64,
    /// Paper venue starting balance (USDC).
    #[serde(default = "default_paper_balance")]
    pub paper_balance: Decimal,
}

fn default_cycle_seconds() -> u64 {
    10
}

fn default_post_only() -> bool {
    true
}

fn default_quote_size_usd() -> Decimal {
    dec!(10)
}

fn default_max_per_market_usd() -> Decimal {
    dec!(50)
}

fn default_min_order_size() -> Decimal {
    dec!(5)
}

fn default_requote_threshold_pts() -> Decimal {
    dec!(1.0)
}

fn default_min_quote_lifetime_seconds() -> u64 {
    30
}

fn default_stale_threshold_seconds() -> u64 {
    60
}

fn default_vol_halflife() -> u32 {
    20
}

fn default_vol_widen_threshold_pts() -> Decimal {
    dec!(3.0)
}

fn default_levels() -> u32 {
    1
}

fn default_level_spread_mult() -> Decimal {
    dec!(1.5)
}

fn default_level_size_mult() -> Decimal {
    dec!(1.0)
}

fn default_two_sided() -> bool {
    true
}

fn default_use_split_merge() -> bool {
    true
}

fn default_split_size_usd() -> Decimal {
    dec!(20)
}

fn default_merge_threshold() -> Decimal {
    dec!(10)
}

fn default_merge_interval_cycles() -> u64 {
    6
}

fn default_reconcile_interval_cycles() -> u64 {
    60
}

fn default_max_position_age_hours() -> Decimal {
    dec!(24)
}

fn default_urgency_skew_bonus() -> Decimal {
    dec!(0.3)
}

fn default_kappa_window_minutes() -> u64 {
    30
}

fn default_event_widen_pct() -> Decimal {
    dec!(50)
}

fn default_max_days_to_resolution() -> Decimal {
    dec!(30)
}

fn default_scan_concurrency() -> usize {
    4
}

fn default_cross_reject_threshold() -> u32 {
    3
}

fn default_cross_cooldown_seconds() -> i64 {
    60
}

fn default_cross_cooldown_max_seconds() -> i64 {
    600
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_cooldown_seconds() -> i64 {
    300
}

fn default_paper_balance() -> Decimal {
    dec!(1000)
}

impl Default for MmConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: default_cycle_seconds(),
            post_only: default_post_only(),
            quote_size_usd: default_quote_size_usd(),
            max_per_market_usd: default_max_per_market_usd(),
            min_order_size: default_min_order_size(),
            requote_threshold_pts: default_requote_threshold_pts(),
            min_quote_lifetime_seconds: default_min_quote_lifetime_seconds(),
            stale_threshold_seconds: default_stale_threshold_seconds(),
            vol_halflife: default_vol_halflife(),
            vol_widen_threshold_pts: default_vol_widen_threshold_pts(),
            levels: default_levels(),
            level_spread_mult: default_level_spread_mult(),
            level_size_mult: default_level_size_mult(),
            two_sided: default_two_sided(),
            use_split_merge: default_use_split_merge(),
            split_size_usd: default_split_size_usd(),
            merge_threshold: default_merge_threshold(),
            merge_interval_cycles: default_merge_interval_cycles(),
            reconcile_interval_cycles: default_reconcile_interval_cycles(),
            max_position_age_hours: default_max_position_age_hours(),
            urgency_skew_bonus: default_urgency_skew_bonus(),
            kappa_window_minutes: default_kappa_window_minutes(),
            event_widen_pct: default_event_widen_pct(),
            max_days_to_resolution: default_max_days_to_resolution(),
            scan_concurrency: default_scan_concurrency(),
            cross_reject_threshold: default_cross_reject_threshold(),
            cross_cooldown_seconds: default_cross_cooldown_seconds(),
            cross_cooldown_max_seconds: default_cross_cooldown_max_seconds(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_cooldown_seconds: default_circuit_breaker_cooldown_seconds(),
            paper_balance: default_paper_balance(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Operating mode.
    #[serde(default)]
    pub operating_mode: OperatingMode,
    /// Pricing engine.
    #[serde(default)]
    pub pricing_mode: PricingMode,
    /// Markets to quote.
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
    /// Loop parameters.
    #[serde(default)]
    pub mm: MmConfig,
    /// Risk thresholds.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Heuristic engine parameters.
    #[serde(default)]
    pub heuristic: HeuristicParams,
    /// Avellaneda-Stoikov parameters.
    #[serde(default)]
    pub avellaneda: AsParams,
}

impl AppConfig {
    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// Path precedence: `OMM_CONFIG` env var, then `config/default.toml`.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("OMM_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()
    }

    /// Reject configs that would quote unquotable values.
    fn validate(self) -> AppResult<Self> {
        for market in &self.markets {
            Price::new(market.paper_mid).validate_quotable()?;
        }
        Size::new(self.mm.quote_size_usd).validate_order()?;
        Size::new(self.mm.min_order_size).validate_order()?;
        Ok(self)
    }
}
