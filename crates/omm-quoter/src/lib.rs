//! Quote lifecycle management for the outcome market-making bot.
//!
//! The `Quoter` owns every `QuotePair` it creates: placement, cancels,
//! requotes and status reconciliation all flow through it, keeping the
//! per-side order state machine consistent. Partially filled orders are
//! preserved across requotes (hanging orders) to retain queue priority
//! and inventory cover.

pub mod quoter;

pub use quoter::{QuoteFailure, QuoteRequest, Quoter};
