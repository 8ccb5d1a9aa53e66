//! Two-leg inventory ledger with weighted-average-cost P&L.
//!
//! Each market carries independent YES and NO leg state. Growing a
//! position re-averages its entry cost; reducing it realizes P&L on the
//! shares closed; crossing through zero re-bases the average at the
//! flipping fill price. Merge/split adjust both legs atomically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use omm_core::{MarketId, Price, Side, Size, TokenId};

use crate::records::{Divergence, InventoryRecord, InventorySnapshot};

/// Position tolerance when reconciling against the store, in shares.
const RECONCILE_TOLERANCE: Decimal = dec!(0.1);

/// Which outcome leg a fill or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Leg {
    Yes,
    No,
}

/// Inventory-level failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InventoryError {
    /// Merge asked for more matched pairs than both legs hold.
    #[error("merge needs {requested} pairs but YES={yes_position} NO={no_position}")]
    InsufficientPairs {
        requested: Decimal,
        yes_position: Decimal,
        no_position: Decimal,
    },
}

/// In-memory inventory state for a single market (YES + NO legs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInventory {
    pub market_id: MarketId,
    pub token_id: Option<TokenId>,
    pub no_token_id: Option<TokenId>,
    /// YES leg position in shares (positive = long).
    pub yes_position: Decimal,
    pub yes_avg_entry: Price,
    pub yes_realized_pnl: Decimal,
    /// NO leg position in shares.
    pub no_position: Decimal,
    pub no_avg_entry: Price,
    pub no_realized_pnl: Decimal,
    /// Set on the first fill that opens a position, cleared when both
    /// legs return to zero.
    pub opened_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl MarketInventory {
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            token_id: None,
            no_token_id: None,
            yes_position: Decimal::ZERO,
            yes_avg_entry: Price::ZERO,
            yes_realized_pnl: Decimal::ZERO,
            no_position: Decimal::ZERO,
            no_avg_entry: Price::ZERO,
            no_realized_pnl: Decimal::ZERO,
            opened_at: None,
            updated_at: Utc::now(),
        }
    }

    /// YES+NO pairs that can be merged back into collateral.
    pub fn mergeable_pairs(&self) -> Decimal {
        if self.yes_position > Decimal::ZERO && self.no_position > Decimal::ZERO {
            self.yes_position.min(self.no_position)
        } else {
            Decimal::ZERO
        }
    }

    /// Realized P&L across both legs.
    pub fn realized_pnl(&self) -> Decimal {
        self.yes_realized_pnl + self.no_realized_pnl
    }

    /// Both legs flat.
    pub fn is_flat(&self) -> bool {
        self.yes_position.is_zero() && self.no_position.is_zero()
    }

    /// Hours since the position was opened, zero when flat.
    pub fn position_age_hours(&self, now: DateTime<Utc>) -> Decimal {
        let Some(opened) = self.opened_at else {
            return Decimal::ZERO;
        };
        if self.is_flat() {
            return Decimal::ZERO;
        }
        let secs = (now - opened).num_seconds().max(0);
        Decimal::from(secs) / dec!(3600)
    }

    /// Apply one fill to the given leg: weighted-average growth, realized
    /// P&L on reductions, re-based average on a sign flip.
    fn apply_fill(&mut self, leg: Leg, side: Side, price: Price, size: Size) {
        let fill_price = price.inner();
        let fill_size = size.inner();
        let signed = match side {
            Side::Buy => fill_size,
            Side::Sell => -fill_size,
        };

        let (position, avg_entry, realized) = match leg {
            Leg::Yes => (
                &mut self.yes_position,
                &mut self.yes_avg_entry,
                &mut self.yes_realized_pnl,
            ),
            Leg::No => (
                &mut self.no_position,
                &mut self.no_avg_entry,
                &mut self.no_realized_pnl,
            ),
        };

        let old = *position;
        let new = old + signed;

        // Reducing an existing position realizes P&L on the shares closed.
        if (old > Decimal::ZERO && signed < Decimal::ZERO)
            || (old < Decimal::ZERO && signed > Decimal::ZERO)
        {
            let closed = signed.abs().min(old.abs());
            let pnl = if old > Decimal::ZERO {
                (fill_price - avg_entry.inner()) * closed
            } else {
                (avg_entry.inner() - fill_price) * closed
            };
            *realized += pnl;
        }

        if new.is_zero() {
            *avg_entry = Price::ZERO;
        } else if !old.is_zero() && new.signum() != old.signum() {
            // Crossed through zero: the remainder entered at this fill.
            *avg_entry = price;
        } else if old.is_zero() || new.signum() == signed.signum() {
            // Opening or growing: weighted average cost.
            let old_notional = old.abs() * avg_entry.inner();
            let new_notional = fill_size * fill_price;
            *avg_entry = Price::new((old_notional + new_notional) / new.abs());
        }
        // Plain reduction leaves the average untouched.

        *position = new;

        debug!(
            market = %self.market_id.short(),
            leg = ?leg,
            %side,
            old = %old,
            new = %new,
            price = %price,
            "inventory fill applied"
        );
    }
}

/// Ledger of per-market inventory across all quoted markets.
///
/// Mutated only by the single loop that owns the market-making cycle;
/// everything here is synchronous bookkeeping.
#[derive(Debug)]
pub struct InventoryLedger {
    inventories: HashMap<MarketId, MarketInventory>,
    /// Fraction of per-market capacity beyond which unwind kicks in.
    unwind_threshold: Decimal,
}

impl InventoryLedger {
    pub fn new(unwind_threshold: Decimal) -> Self {
        Self {
            inventories: HashMap::new(),
            unwind_threshold,
        }
    }

    /// Get or create inventory for a market.
    pub fn entry(&mut self, market_id: &MarketId) -> &mut MarketInventory {
        self.inventories
            .entry(market_id.clone())
            .or_insert_with(|| MarketInventory::new(market_id.clone()))
    }

    /// Read-only lookup.
    pub fn get(&self, market_id: &MarketId) -> Option<&MarketInventory> {
        self.inventories.get(market_id)
    }

    /// Apply a fill to one leg of a market.
    pub fn process_fill(
        &mut self,
        market_id: &MarketId,
        token_id: &TokenId,
        leg: Leg,
        side: Side,
        price: Price,
        size: Size,
    ) {
        let inv = self.entry(market_id);
        inv.updated_at = Utc::now();
        match leg {
            Leg::Yes => inv.token_id = Some(token_id.clone()),
            Leg::No => inv.no_token_id = Some(token_id.clone()),
        }

        inv.apply_fill(leg, side, price, size);

        // First fill that opens a long position starts the age clock.
        if side == Side::Buy && inv.opened_at.is_none() {
            let opened = match leg {
                Leg::Yes => inv.yes_position > Decimal::ZERO,
                Leg::No => inv.no_position > Decimal::ZERO,
            };
            if opened {
                inv.opened_at = Some(Utc::now());
            }
        }
        if inv.is_flat() {
            inv.opened_at = None;
        }
    }

    /// Record a merge: reduces both legs equally.
    pub fn process_merge(
        &mut self,
        market_id: &MarketId,
        amount: Decimal,
    ) -> Result<(), InventoryError> {
        let inv = self.entry(market_id);
        if inv.yes_position < amount || inv.no_position < amount {
            warn!(
                market = %market_id.short(),
                %amount,
                yes = %inv.yes_position,
                no = %inv.no_position,
                "merge rejected: insufficient matched pairs"
            );
            return Err(InventoryError::InsufficientPairs {
                requested: amount,
                yes_position: inv.yes_position,
                no_position: inv.no_position,
            });
        }
        inv.yes_position -= amount;
        inv.no_position -= amount;
        inv.updated_at = Utc::now();
        if inv.is_flat() {
            inv.opened_at = None;
        }
        info!(
            market = %market_id.short(),
            %amount,
            yes = %inv.yes_position,
            no = %inv.no_position,
            "merged pairs into collateral"
        );
        Ok(())
    }

    /// Record a split: adds equal size to both legs. A split costs $1 per
    /// pair, so a leg with no prior basis starts at a symmetric $0.50.
    pub fn process_split(
        &mut self,
        market_id: &MarketId,
        amount: Decimal,
        yes_token_id: &TokenId,
        no_token_id: &TokenId,
    ) {
        let inv = self.entry(market_id);
        inv.token_id = Some(yes_token_id.clone());
        inv.no_token_id = Some(no_token_id.clone());
        inv.yes_position += amount;
        inv.no_position += amount;
        inv.updated_at = Utc::now();
        if !inv.yes_avg_entry.is_positive() {
            inv.yes_avg_entry = Price::new(dec!(0.50));
        }
        if !inv.no_avg_entry.is_positive() {
            inv.no_avg_entry = Price::new(dec!(0.50));
        }
        info!(
            market = %market_id.short(),
            %amount,
            yes = %inv.yes_position,
            no = %inv.no_position,
            "split collateral into pairs"
        );
    }

    /// Total absolute exposure across all markets in USDC, both legs.
    pub fn total_exposure(&self) -> Decimal {
        self.inventories
            .values()
            .map(|inv| {
                let yes = if inv.yes_avg_entry.is_positive() {
                    inv.yes_position.abs() * inv.yes_avg_entry.inner()
                } else {
                    Decimal::ZERO
                };
                let no = if inv.no_avg_entry.is_positive() {
                    inv.no_position.abs() * inv.no_avg_entry.inner()
                } else {
                    Decimal::ZERO
                };
                yes + no
            })
            .sum()
    }

    /// Realized P&L summed over all markets and both legs.
    pub fn total_realized_pnl(&self) -> Decimal {
        self.inventories.values().map(|i| i.realized_pnl()).sum()
    }

    /// Unwind urgency on [0, 1] from position age: 0 fresh, 1 at or
    /// beyond `max_hours`. Feeds extra skew for aging positions.
    pub fn unwind_urgency(
        &self,
        market_id: &MarketId,
        max_hours: Decimal,
        now: DateTime<Utc>,
    ) -> Decimal {
        let Some(inv) = self.inventories.get(market_id) else {
            return Decimal::ZERO;
        };
        if max_hours <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (inv.position_age_hours(now) / max_hours).min(Decimal::ONE)
    }

    /// YES position beyond the unwind threshold fraction of capacity.
    pub fn needs_unwind(&self, market_id: &MarketId, max_per_market: Decimal) -> bool {
        let Some(inv) = self.inventories.get(market_id) else {
            return false;
        };
        inv.yes_position.abs() > max_per_market * self.unwind_threshold
    }

    /// Inventory notional at or beyond per-market capacity. Legs with no
    /// entry basis are valued at the supplied mid (NO leg at `1 - mid`).
    pub fn is_at_capacity(
        &self,
        market_id: &MarketId,
        max_per_market: Decimal,
        mid: Option<Price>,
    ) -> bool {
        let Some(inv) = self.inventories.get(market_id) else {
            return false;
        };
        let mid_val = mid.map(|p| p.inner()).unwrap_or(Decimal::ZERO);
        let yes_price = if inv.yes_avg_entry.is_positive() {
            inv.yes_avg_entry.inner()
        } else {
            mid_val
        };
        let no_price = if inv.no_avg_entry.is_positive() {
            inv.no_avg_entry.inner()
        } else if mid_val > Decimal::ZERO {
            Decimal::ONE - mid_val
        } else {
            Decimal::ZERO
        };
        let total = inv.yes_position.abs() * yes_price + inv.no_position.abs() * no_price;
        total >= max_per_market
    }

    /// Net inventory skew in value terms, normalized by capacity.
    /// Positive = long YES, negative = long NO.
    pub fn skew_direction(&self, market_id: &MarketId, max_per_market: Decimal) -> Decimal {
        let Some(inv) = self.inventories.get(market_id) else {
            return Decimal::ZERO;
        };
        if max_per_market <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let yes_px = if inv.yes_avg_entry.is_positive() {
            inv.yes_avg_entry.inner()
        } else {
            dec!(0.5)
        };
        let no_px = if inv.no_avg_entry.is_positive() {
            inv.no_avg_entry.inner()
        } else {
            dec!(0.5)
        };
        (inv.yes_position * yes_px - inv.no_position * no_px) / max_per_market
    }

    /// Pairs available to merge for a market.
    pub fn merge_amount(&self, market_id: &MarketId) -> Decimal {
        self.inventories
            .get(market_id)
            .map(|inv| inv.mergeable_pairs())
            .unwrap_or(Decimal::ZERO)
    }

    /// Reporting snapshots for all markets with a non-negligible position.
    pub fn snapshots(&self) -> Vec<InventorySnapshot> {
        self.inventories
            .values()
            .filter(|inv| {
                inv.yes_position.abs() > dec!(0.001) || inv.no_position.abs() > dec!(0.001)
            })
            .map(|inv| InventorySnapshot {
                market_id: inv.market_id.clone(),
                token_id: inv.token_id.clone(),
                no_token_id: inv.no_token_id.clone(),
                yes_position: inv.yes_position,
                no_position: inv.no_position,
                yes_avg_entry: inv.yes_avg_entry,
                no_avg_entry: inv.no_avg_entry,
                realized_pnl: inv.realized_pnl(),
                mergeable_pairs: inv.mergeable_pairs(),
            })
            .collect()
    }

    /// Restore state from persisted records, grouping rows by market.
    /// The first token seen for a market is the YES leg; a second,
    /// different token is the NO leg.
    pub fn load_from_store(&mut self, records: &[InventoryRecord]) {
        let mut by_market: HashMap<MarketId, Vec<&InventoryRecord>> = HashMap::new();
        for rec in records {
            by_market.entry(rec.market_id.clone()).or_default().push(rec);
        }

        for (market_id, rows) in &by_market {
            let mut inv = MarketInventory::new(market_id.clone());
            for rec in rows {
                let is_no = inv
                    .token_id
                    .as_ref()
                    .is_some_and(|yes| *yes != rec.token_id);
                if is_no {
                    inv.no_token_id = Some(rec.token_id.clone());
                    inv.no_position = rec.net_position;
                    inv.no_avg_entry = rec.avg_entry_price;
                    inv.no_realized_pnl = rec.realized_pnl;
                } else {
                    inv.token_id = Some(rec.token_id.clone());
                    inv.yes_position = rec.net_position;
                    inv.yes_avg_entry = rec.avg_entry_price;
                    inv.yes_realized_pnl = rec.realized_pnl;
                }
            }
            self.inventories.insert(market_id.clone(), inv);
        }
        info!(
            markets = by_market.len(),
            records = records.len(),
            "loaded inventory from store"
        );
    }

    /// Compare memory against the persisted store and correct any
    /// divergence beyond tolerance. The store wins; every correction is
    /// returned for audit logging, never silently applied.
    pub fn reconcile_with_store(&mut self, records: &[InventoryRecord]) -> Vec<Divergence> {
        let mut divergences = Vec::new();

        for rec in records {
            let inv = self.entry(&rec.market_id);
            let is_no = match (&inv.no_token_id, &inv.token_id) {
                (Some(no), _) if *no == rec.token_id => true,
                (_, Some(yes)) if *yes != rec.token_id => true,
                _ => false,
            };
            let mem_pos = if is_no {
                inv.no_position
            } else {
                inv.yes_position
            };

            if (mem_pos - rec.net_position).abs() > RECONCILE_TOLERANCE {
                warn!(
                    market = %rec.market_id.short(),
                    token = %rec.token_id.short(),
                    mem = %mem_pos,
                    store = %rec.net_position,
                    "inventory divergence corrected from store"
                );
                if is_no {
                    inv.no_position = rec.net_position;
                    if inv.no_token_id.is_none() {
                        inv.no_token_id = Some(rec.token_id.clone());
                    }
                } else {
                    inv.yes_position = rec.net_position;
                    if inv.token_id.is_none() {
                        inv.token_id = Some(rec.token_id.clone());
                        inv.yes_avg_entry = rec.avg_entry_price;
                    }
                }
                divergences.push(Divergence {
                    market_id: rec.market_id.clone(),
                    token_id: rec.token_id.clone(),
                    leg: if is_no { Leg::No } else { Leg::Yes },
                    mem_position: mem_pos,
                    store_position: rec.net_position,
                });
            }
        }

        divergences
    }
}
