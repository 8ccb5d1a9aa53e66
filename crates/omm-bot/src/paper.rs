//! Paper venue for shadow runs.
//!
//! Implements the venue contract without external calls: orders are
//! accepted and rest as live maker orders, books are static snapshots
//! seeded from configuration, and split/merge always settle. The live
//! CLOB connector plugs in through the same `VenueClient` seam.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use omm_core::{BookSummary, ConditionId, OrderId, Price, TokenId};
use omm_venue::{OrderArgs, OrderStatusReport, VenueClient, VenueError, VenueResult};

/// In-process venue: every order rests unfilled at its quoted price.
pub struct PaperVenue {
    books: Mutex<HashMap<TokenId, BookSummary>>,
    orders: Mutex<HashMap<OrderId, OrderArgs>>,
    balance: Mutex<Decimal>,
    next_id: Mutex<u64>,
}

impl PaperVenue {
    /// Seed a venue with one book per token at the given mid, two ticks
    /// wide with symmetric depth.
    pub fn new(balance: Decimal, mids: &[(TokenId, Decimal)]) -> Self {
        let mut books = HashMap::new();
        for (token_id, mid) in mids {
            let bid = Price::new(mid - dec!(0.01)).clamp_quotable().round_to_tick();
            let ask = Price::new(mid + dec!(0.01)).clamp_quotable().round_to_tick();
            books.insert(
                token_id.clone(),
                BookSummary::new(bid, ask, dec!(100), dec!(100)),
            );
        }
        Self {
            books: Mutex::new(books),
            orders: Mutex::new(HashMap::new()),
            balance: Mutex::new(balance),
            next_id: Mutex::new(0),
        }
    }

    /// Number of resting orders.
    pub fn open_order_count(&self) -> usize {
        self.orders.lock().len()
    }
}

impl VenueClient for PaperVenue {
    fn place_limit_order(&self, args: OrderArgs) -> BoxFuture<'_, VenueResult<OrderId>> {
        let mut next = self.next_id.lock();
        *next += 1;
        let order_id = OrderId::new(format!("paper-{}", *next));
        drop(next);
        self.orders.lock().insert(order_id.clone(), args);
        Box::pin(async move { Ok(order_id) })
    }

    fn cancel_order(&self, order_id: OrderId) -> BoxFuture<'_, VenueResult<bool>> {
        let removed = self.orders.lock().remove(&order_id).is_some();
        Box::pin(async move { Ok(removed) })
    }

    fn order_status(&self, order_id: OrderId) -> BoxFuture<'_, VenueResult<OrderStatusReport>> {
        let result = if self.orders.lock().contains_key(&order_id) {
            Ok(OrderStatusReport {
                status: "LIVE".to_string(),
                is_filled: false,
                size_matched: Decimal::ZERO,
                avg_fill_price: None,
            })
        } else {
            Err(VenueError::UnknownOrder(order_id))
        };
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
        _condition_id: ConditionId,
        amount: Decimal,
    ) -> BoxFuture<'_, VenueResult<bool>> {
        *self.balance.lock() += amount;
        Box::pin(async move { Ok(true) })
    }

    fn split_position(
        &self,
        _condition_id: ConditionId,
        amount: Decimal,
    ) -> BoxFuture<'_, VenueResult<bool>> {
        let mut balance = self.balance.lock();
        if *balance < amount {
            return Box::pin(async move {
                Err(VenueError::Rejected("insufficient collateral".to_string()))
            });
        }
        *balance -= amount;
        Box::pin(async move { Ok(true) })
    }

    fn collateral_balance(&self) -> BoxFuture<'_, VenueResult<Decimal>> {
        let balance = *self.balance.lock();
        Box::pin(async move { Ok(balance) })
    }
}
