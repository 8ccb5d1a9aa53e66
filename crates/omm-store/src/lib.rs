//! Persistence seam for the outcome market-making bot.
//!
//! The store is the cross-restart source of truth: quotes, fills,
//! inventory snapshots, the high-water mark and daily metrics are
//! upserted idempotently, and inventory reconciliation reads back from
//! here. `MemoryStore` backs tests and dry runs; a real deployment
//! plugs a database-backed implementation into the same trait.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{DailyMetrics, Store, StoreError, StoreResult};
