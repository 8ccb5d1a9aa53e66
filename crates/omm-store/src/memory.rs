//! In-memory store for tests and dry runs.

use std::collections::HashMap;

use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use omm_core::{FillRecord, MarketId, QuotePair};
use omm_inventory::{InventoryRecord, InventorySnapshot};

use crate::store::{DailyMetrics, Store, StoreError, StoreResult};

/// `Store` backed by in-process maps. Inventory snapshots are flattened
/// into per-leg rows on read, mirroring how a database table stores them.
#[derive(Default)]
pub struct MemoryStore {
    quotes: Mutex<HashMap<MarketId, QuotePair>>,
    fills: Mutex<Vec<FillRecord>>,
    inventory: Mutex<HashMap<MarketId, InventorySnapshot>>,
    high_water_mark: Mutex<Decimal>,
    daily_metrics: Mutex<HashMap<NaiveDate, DailyMetrics>>,
    /// When set, every call fails; exercises degraded-store paths in tests.
    fail: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock() = failing;
    }

    fn check(&self) -> StoreResult<()> {
        if *self.fail.lock() {
            Err(StoreError::Unavailable("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    /// All recorded fills, oldest first.
    pub fn fills(&self) -> Vec<FillRecord> {
        self.fills.lock().clone()
    }

    /// Metrics row for a day, if recorded.
    pub fn metrics_for(&self, date: NaiveDate) -> Option<DailyMetrics> {
        self.daily_metrics.lock().get(&date).cloned()
    }
}

impl Store for MemoryStore {
    fn upsert_quote(&self, pair: QuotePair) -> BoxFuture<'_, StoreResult<()>> {
        let result = self.check().map(|()| {
            self.quotes.lock().insert(pair.market_id.clone(), pair);
        });
        Box::pin(async move { result })
    }

    fn active_quote(&self, market_id: MarketId) -> BoxFuture<'_, StoreResult<Option<QuotePair>>> {
        let result = self
            .check()
            .map(|()| self.quotes.lock().get(&market_id).cloned());
        Box::pin(async move { result })
    }

    fn record_fill(&self, fill: FillRecord) -> BoxFuture<'_, StoreResult<()>> {
        let result = self.check().map(|()| {
            self.fills.lock().push(fill);
        });
        Box::pin(async move { result })
    }

    fn upsert_inventory(&self, snapshot: InventorySnapshot) -> BoxFuture<'_, StoreResult<()>> {
        let result = self.check().map(|()| {
            self.inventory
                .lock()
                .insert(snapshot.market_id.clone(), snapshot);
        });
        Box::pin(async move { result })
    }

    fn load_inventory(&self) -> BoxFuture<'_, StoreResult<Vec<InventoryRecord>>> {
        let result = self.check().map(|()| {
            let mut rows = Vec::new();
            for snap in self.inventory.lock().values() {
                if let Some(token_id) = &snap.token_id {
                    rows.push(InventoryRecord {
                        market_id: snap.market_id.clone(),
                        token_id: token_id.clone(),
                        net_position: snap.yes_position,
                        avg_entry_price: snap.yes_avg_entry,
                        realized_pnl: snap.realized_pnl,
                    });
                }
                if let Some(no_token_id) = &snap.no_token_id {
                    rows.push(InventoryRecord {
                        market_id: snap.market_id.clone(),
                        token_id: no_token_id.clone(),
                        net_position: snap.no_position,
                        avg_entry_price: snap.no_avg_entry,
                        realized_pnl: Decimal::ZERO,
                    });
                }
            }
            rows
        });
        Box::pin(async move { result })
    }

    fn high_water_mark(&self) -> BoxFuture<'_, StoreResult<Decimal>> {
        let result = self.check().map(|()| *self.high_water_mark.lock());
        Box::pin(async move { result })
    }

    fn update_high_water_mark(&self, value: Decimal) -> BoxFuture<'_, StoreResult<()>> {
        let result = self.check().map(|()| {
            let mut hwm = self.high_water_mark.lock();
            if value > *hwm {
                *hwm = value;
            }
        });
        Box::pin(async move { result })
    }

    fn record_daily_metrics(&self, metrics: DailyMetrics) -> BoxFuture<'_, StoreResult<()>> {
        let result = self.check().map(|()| {
            self.daily_metrics.lock().insert(metrics.date, metrics);
        });
        Box::pin(async move { result })
    }
}
