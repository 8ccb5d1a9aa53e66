//! `Store` trait and persisted record types.

use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use omm_core::{FillRecord, MarketId, QuotePair};
use omm_inventory::{InventoryRecord, InventorySnapshot};

/// Store-level failure for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregated metrics for one UTC day.
///
/// Returns are expressed as a percentage of portfolio value; absolute
/// P&L is carried separately so the two are never mixed.
/// `fill_edge_pts` sums the per-fill edge against the quoted mid in
/// points; `adverse_fill_count` counts fills that landed through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub realized_pnl: Decimal,
    pub return_pct: Decimal,
    pub volume: Decimal,
    pub fill_count: u64,
    pub fill_edge_pts: Decimal,
    pub adverse_fill_count: u64,
    pub portfolio_value: Decimal,
}

/// Persistence contract. All writes are idempotent upserts.
pub trait Store: Send + Sync {
    /// Upsert the active quote pair for its market.
    fn upsert_quote(&self, pair: QuotePair) -> BoxFuture<'_, StoreResult<()>>;

    /// Read the active quote pair for a market, if any.
    fn active_quote(&self, market_id: MarketId) -> BoxFuture<'_, StoreResult<Option<QuotePair>>>;

    /// Append a fill record.
    fn record_fill(&self, fill: FillRecord) -> BoxFuture<'_, StoreResult<()>>;

    /// Upsert one market's inventory snapshot.
    fn upsert_inventory(&self, snapshot: InventorySnapshot) -> BoxFuture<'_, StoreResult<()>>;

    /// Load all persisted inventory rows (one per token leg).
    fn load_inventory(&self) -> BoxFuture<'_, StoreResult<Vec<InventoryRecord>>>;

    /// Current portfolio high-water mark; zero when never set.
    fn high_water_mark(&self) -> BoxFuture<'_, StoreResult<Decimal>>;

    /// Raise the high-water mark if `value` exceeds the stored peak.
    fn update_high_water_mark(&self, value: Decimal) -> BoxFuture<'_, StoreResult<()>>;

    /// Upsert the metrics row for a day.
    fn record_daily_metrics(&self, metrics: DailyMetrics) -> BoxFuture<'_, StoreResult<()>>;
}
