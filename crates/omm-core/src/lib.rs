//! Core domain types for the outcome market-making bot.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Size`: precision-safe decimal types on the [0, 1] outcome scale
//! - `MarketId`, `TokenId`, `ConditionId`, `OrderId`: identifier newtypes
//! - `OrderState`: explicit order state machine with a validated adjacency table
//! - `QuotePair`: one bid + one ask tied to a single market/token
//! - `BookSummary`: observed top-of-book snapshot from the venue

pub mod book;
pub mod decimal;
pub mod error;
pub mod fill;
pub mod ids;
pub mod order;
pub mod quote;

pub use book::BookSummary;
pub use decimal::{Price, Size, MAX_PRICE, MIN_PRICE, TICK};
pub use error::{CoreError, Result};
pub use fill::FillRecord;
pub use ids::{ConditionId, MarketId, OrderId, TokenId};
pub use order::{can_transition, parse_venue_status, InvalidTransition, OrderState, Side};
pub use quote::{QuotePair, Transition};
