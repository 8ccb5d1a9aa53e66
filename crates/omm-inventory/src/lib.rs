//! Inventory ledger for the outcome market-making bot.
//!
//! Tracks both legs (YES and NO tokens) of every market the bot quotes:
//! weighted-average-cost entry tracking, realized P&L on reductions,
//! split/merge bookkeeping, and periodic reconciliation against the
//! persisted store, which is the cross-restart source of truth.

pub mod ledger;
pub mod records;

pub use ledger::{InventoryError, InventoryLedger, Leg, MarketInventory};
pub use records::{Divergence, InventoryRecord, InventorySnapshot};
