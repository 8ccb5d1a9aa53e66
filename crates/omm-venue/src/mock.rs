//! Scripted venue mock for tests.
//!
//! Responses are queued ahead of time and recorded calls can be inspected
//! afterwards. Placement results pop FIFO so a test can script "bid ok,
//! ask rejected" in order.

use std::collections::{HashMap, VecDeque};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use omm_core::{BookSummary, ConditionId, OrderId, Price, TokenId};

use crate::client::{OrderArgs, OrderStatusReport, VenueClient, VenueError, VenueResult};

/// Scripted mock venue.
pub struct MockVenue {
    /// FIFO queue of placement results.
    place_results: Mutex<VecDeque<VenueResult<OrderId>>>,
    /// Recorded placements for verification.
    placements: Mutex<Vec<OrderArgs>>,
    /// Recorded cancels.
    cancels: Mutex<Vec<OrderId>>,
    /// Cancel result (applies to every cancel).
    cancel_result: Mutex<VenueResult<bool>>,
    /// Status report per order id.
    statuses: Mutex<HashMap<OrderId, OrderStatusReport>>,
    /// Book summary per token id.
    books: Mutex<HashMap<TokenId, BookSummary>>,
    /// Result for merge/split calls.
    settlement_result: Mutex<VenueResult<bool>>,
    /// Recorded merge calls: (condition, amount).
    merges: Mutex<Vec<(ConditionId, Decimal)>>,
    /// Recorded split calls: (condition, amount).
    splits: Mutex<Vec<(ConditionId, Decimal)>>,
    /// Result for collateral balance queries.
    balance: Mutex<VenueResult<Decimal>>,
}

impl Default for MockVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVenue {
    pub fn new() -> Self {
        Self {
            place_results: Mutex::new(VecDeque::new()),
            placements: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            cancel_result: Mutex::new(Ok(true)),
            statuses: Mutex::new(HashMap::new()),
            books: Mutex::new(HashMap::new()),
            settlement_result: Mutex::new(Ok(true)),
            merges: Mutex::new(Vec::new()),
            splits: Mutex::new(Vec::new()),
            balance: Mutex::new(Ok(Decimal::from(1000))),
        }
    }

    /// Queue the result of the next placement call.
    pub fn push_place_result(&self, result: VenueResult<OrderId>) {
        self.place_results.lock().push_back(result);
    }

    /// Convenience: queue a successful placement returning `order_id`.
    pub fn push_order_id(&self, order_id: &str) {
        self.push_place_result(Ok(OrderId::new(order_id)));
    }

    /// Set the result returned for every cancel call.
    pub fn set_cancel_result(&self, result: VenueResult<bool>) {
        *self.cancel_result.lock() = result;
    }

    /// Script the status report for an order id.
    pub fn set_status(&self, order_id: &str, report: OrderStatusReport) {
        self.statuses.lock().insert(OrderId::new(order_id), report);
    }

    /// Convenience: script a plain status with matched size.
    pub fn set_status_simple(&self, order_id: &str, status: &str, size_matched: Decimal) {
        let is_filled = matches!(status.to_ascii_uppercase().as_str(), "MATCHED" | "FILLED");
        self.set_status(
            order_id,
            OrderStatusReport {
                status: status.to_string(),
                is_filled,
                size_matched,
                avg_fill_price: None,
            },
        );
    }

    /// Script the book summary for a token.
    pub fn set_book(&self, token_id: &str, book: BookSummary) {
        self.books.lock().insert(TokenId::new(token_id), book);
    }

    /// Set the result returned for merge/split calls.
    pub fn set_settlement_result(&self, result: VenueResult<bool>) {
        *self.settlement_result.lock() = result;
    }

    /// Set the collateral balance returned for balance queries.
    pub fn set_balance(&self, result: VenueResult<Decimal>) {
        *self.balance.lock() = result;
    }

    /// Recorded placements.
    pub fn placements(&self) -> Vec<OrderArgs> {
        self.placements.lock().clone()
    }

    /// Recorded cancels.
    pub fn cancels(&self) -> Vec<OrderId> {
        self.cancels.lock().clone()
    }

    /// Recorded merges.
    pub fn merges(&self) -> Vec<(ConditionId, Decimal)> {
        self.merges.lock().clone()
    }

    /// Recorded splits.
    pub fn splits(&self) -> Vec<(ConditionId, Decimal)> {
        self.splits.lock().clone()
    }
}

impl VenueClient for MockVenue {
    fn place_limit_order(&self, args: OrderArgs) -> BoxFuture<'_, VenueResult<OrderId>> {
        self.placements.lock().push(args);
        let result = self
            .place_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(VenueError::Unavailable("no scripted result".to_string())));
        Box::pin(async move { result })
    }

    fn cancel_order(&self, order_id: OrderId) -> BoxFuture<'_, VenueResult<bool>> {
        self.cancels.lock().push(order_id);
        let result = self.cancel_result.lock().clone();
        Box::pin(async move { result })
    }

    fn order_status(&self, order_id: OrderId) -> BoxFuture<'_, VenueResult<OrderStatusReport>> {
        let result = self
            .statuses
            .lock()
            .get(&order_id)
            .cloned()
            .ok_or(VenueError::UnknownOrder(order_id));
        Box::pin(async move { result })
    }

    fn get_book_summary(&self, token_id: TokenId) -> BoxFuture<'_, VenueResult<BookSummary>> {
        let result = self
            .books
            .lock()
            .get(&token_id)
            .cloned()
            .ok_or_else(|| VenueError::Unavailable(format!("no book for {token_id}")));
        Box::pin(async move { result })
    }

    fn merge_positions(
        &self,
        condition_id: ConditionId,
        amount: Decimal,
    ) -> BoxFuture<'_, VenueResult<bool>> {
        self.merges.lock().push((condition_id, amount));
        let result = self.settlement_result.lock().clone();
        Box::pin(async move { result })
    }

    fn split_position(
        &self,
        condition_id: ConditionId,
        amount: Decimal,
    ) -> BoxFuture<'_, VenueResult<bool>> {
        self.splits.lock().push((condition_id, amount));
        let result = self.settlement_result.lock().clone();
        Box::pin(async move { result })
    }

    fn collateral_balance(&self) -> BoxFuture<'_, VenueResult<Decimal>> {
        let result = self.balance.lock().clone();
        Box::pin(async move { result })
    }
}

/// Default book used by several test suites: 0.48/0.52, balanced depth.
pub fn balanced_book() -> BookSummary {
    use rust_decimal_macros::dec;
    BookSummary::new(
        Price::new(dec!(0.48)),
        Price::new(dec!(0.52)),
        dec!(100),
        dec!(100),
    )
}
