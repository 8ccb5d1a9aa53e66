//! `VenueClient` trait and its wire types.

use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use omm_core::{BookSummary, ConditionId, OrderId, OrderState, Price, Side, Size, TokenId};

/// Venue-level failure for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    /// Order refused by the venue (e.g. post-only would cross the book).
    /// Expected during normal operation; the side is skipped this cycle.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// Transport or venue outage. The market is skipped this cycle.
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    /// The venue does not recognize the order id.
    #[error("unknown order: {0}")]
    UnknownOrder(OrderId),
}

/// Result alias for venue calls.
pub type VenueResult<T> = Result<T, VenueError>;

/// Order type on the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    /// Good-til-cancelled limit order.
    Gtc,
    /// Fill-or-kill.
    Fok,
}

/// Arguments for a limit order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderArgs {
    pub token_id: TokenId,
    pub price: Price,
    pub size: Size,
    pub side: Side,
    pub kind: OrderKind,
    /// Reject instead of crossing the book (maker-only execution).
    pub post_only: bool,
}

/// Status snapshot for one order, as reported by the venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusReport {
    /// Raw venue status string (mapped via `parse_venue_status`).
    pub status: String,
    /// True when the order is completely matched.
    pub is_filled: bool,
    /// Shares matched so far (partial or full).
    pub size_matched: Decimal,
    /// Average fill price when the venue reports it.
    pub avg_fill_price: Option<Price>,
}

impl OrderStatusReport {
    /// Map the raw status string onto the order state machine.
    pub fn state(&self) -> OrderState {
        omm_core::parse_venue_status(&self.status)
    }
}

/// Call contract against the external CLOB venue.
///
/// All methods are suspend points: implementations perform blocking I/O on
/// a worker pool and return boxed futures so the trait stays object-safe.
/// Expected rejections surface as `Err(VenueError::Rejected)`, never panics.
pub trait VenueClient: Send + Sync {
    /// Place a limit order. Returns the venue-assigned order id.
    fn place_limit_order(&self, args: OrderArgs) -> BoxFuture<'_, VenueResult<OrderId>>;

    /// Cancel an order. `false` means the venue refused the cancel
    /// (commonly because the order already filled).
    fn cancel_order(&self, order_id: OrderId) -> BoxFuture<'_, VenueResult<bool>>;

    /// Poll the status of an order.
    fn order_status(&self, order_id: OrderId) -> BoxFuture<'_, VenueResult<OrderStatusReport>>;

    /// Fetch a top-of-book summary for a token.
    fn get_book_summary(&self, token_id: TokenId) -> BoxFuture<'_, VenueResult<BookSummary>>;

    /// Merge matched YES+NO pairs back into collateral.
    /// `false` means the venue refused the merge.
    fn merge_positions(
        &self,
        condition_id: ConditionId,
        amount: Decimal,
    ) -> BoxFuture<'_, VenueResult<bool>>;

    /// Split collateral into equal YES+NO positions.
    fn split_position(
        &self,
        condition_id: ConditionId,
        amount: Decimal,
    ) -> BoxFuture<'_, VenueResult<bool>>;

    /// Spendable collateral balance in USDC. On-chain balance is the
    /// source of truth for budget decisions, never a cached value.
    fn collateral_balance(&self) -> BoxFuture<'_, VenueResult<Decimal>>;
}
