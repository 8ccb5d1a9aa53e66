//! Place, cancel, requote and reconcile quote pairs against the venue.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info, warn};

use omm_core::{
    ConditionId, FillRecord, MarketId, OrderId, OrderState, Price, QuotePair, Side, Size, TokenId,
};
use omm_venue::{OrderArgs, OrderKind, VenueClient, VenueError};

/// Minimum price move before a live order is cancelled during a
/// hanging-preserving requote, in price units ($0.005 = half a tick).
const REQUOTE_CANCEL_THRESHOLD: Decimal = dec!(0.005);

/// Everything needed to place one quote pair.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub no_token_id: Option<TokenId>,
    pub condition_id: Option<ConditionId>,
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_size: Size,
    pub ask_size: Size,
    /// Market mid observed when the quote was computed.
    pub quoted_mid: Price,
    pub place_bid: bool,
    pub place_ask: bool,
}

/// Structured diagnostics for a total quote failure (neither side placed).
#[derive(Debug, Clone, Serialize)]
pub struct QuoteFailure {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub bid_error: Option<String>,
    pub ask_error: Option<String>,
    pub place_bid: bool,
    pub place_ask: bool,
    pub bid_price: Price,
    pub ask_price: Price,
}

/// Quote lifecycle manager. One instance serves all markets, but a given
/// market's pair must only ever be mutated from the single loop that
/// owns that market.
pub struct Quoter<C: VenueClient> {
    client: Arc<C>,
    post_only: bool,
    last_failure: Option<QuoteFailure>,
}

impl<C: VenueClient> Quoter<C> {
    pub fn new(client: Arc<C>, post_only: bool) -> Self {
        Self {
            client,
            post_only,
            last_failure: None,
        }
    }

    /// Diagnostics from the most recent total placement failure, cleared
    /// on the next placement attempt.
    pub fn last_failure(&self) -> Option<&QuoteFailure> {
        self.last_failure.as_ref()
    }

    async fn place_single(
        &self,
        token_id: &TokenId,
        price: Price,
        size: Size,
        side: Side,
    ) -> Result<OrderId, VenueError> {
        self.client
            .place_limit_order(OrderArgs {
                token_id: token_id.clone(),
                price,
                size,
                side,
                kind: OrderKind::Gtc,
                post_only: self.post_only,
            })
            .await
    }

    /// Place up to two orders for a quote pair. Either side is
    /// individually omittable. Returns `None` when neither side was
    /// placed; the structured failure is retrievable via
    /// `last_failure()`.
    pub async fn place_quote_pair(&mut self, req: QuoteRequest) -> Option<QuotePair> {
        self.last_failure = None;

        let mut pair = QuotePair::new(
            req.market_id.clone(),
            req.token_id.clone(),
            req.bid_price,
            req.ask_price,
            req.bid_size,
            req.ask_size,
        );
        pair.no_token_id = req.no_token_id.clone();
        pair.condition_id = req.condition_id.clone();
        pair.quoted_mid = req.quoted_mid;

        let mut bid_error = None;
        let mut ask_error = None;

        if req.place_bid {
            match self
                .place_single(&req.token_id, req.bid_price, req.bid_size, Side::Buy)
                .await
            {
                Ok(order_id) => {
                    pair.bid_order_id = Some(order_id);
                    pair.bid_state = OrderState::Live;
                }
                Err(err) => {
                    pair.bid_state = OrderState::Cancelled;
                    bid_error = Some(err);
                }
            }
        } else {
            pair.bid_state = OrderState::Cancelled;
        }

        if req.place_ask {
            match self
                .place_single(&req.token_id, req.ask_price, req.ask_size, Side::Sell)
                .await
            {
                Ok(order_id) => {
                    pair.ask_order_id = Some(order_id);
                    pair.ask_state = OrderState::Live;
                }
                Err(err) => {
                    pair.ask_state = OrderState::Cancelled;
                    ask_error = Some(err);
                }
            }
        } else {
            pair.ask_state = OrderState::Cancelled;
        }

        if pair.bid_order_id.is_none() && pair.ask_order_id.is_none() {
            warn!(
                market = %req.market_id.short(),
                bid_error = ?bid_error,
                ask_error = ?ask_error,
                "quote failed on both sides"
            );
            self.last_failure = Some(QuoteFailure {
                market_id: req.market_id,
                token_id: req.token_id,
                bid_error: bid_error.map(|e| e.to_string()),
                ask_error: ask_error.map(|e| e.to_string()),
                place_bid: req.place_bid,
                place_ask: req.place_ask,
                bid_price: req.bid_price,
                ask_price: req.ask_price,
            });
            return None;
        }

        let mode = match (pair.bid_order_id.is_some(), pair.ask_order_id.is_some()) {
            (true, true) => "BID+ASK",
            (true, false) => "BID-only",
            _ => "ASK-only",
        };
        info!(
            market = %req.market_id.short(),
            mode,
            bid = %req.bid_price,
            ask = %req.ask_price,
            "quote placed"
        );
        Some(pair)
    }

    /// Cancel every side of a pair that could still rest on the book.
    ///
    /// Covers open sides and sides stuck in UNKNOWN after a failed
    /// status poll; an UNKNOWN order may well still be live at the
    /// venue. A venue answer of "unknown order" counts as confirmed
    /// gone. Returns false if any cancel was refused or unconfirmed;
    /// such a side keeps its state so the caller can retain the pair
    /// and let reconciliation pick up the race.
    pub async fn cancel_quote_pair(&self, pair: &mut QuotePair) -> bool {
        let mut success = true;

        if let Some(order_id) = pair.bid_order_id.clone() {
            if !pair.bid_state.is_done() {
                match self.client.cancel_order(order_id).await {
                    Ok(true) | Err(VenueError::UnknownOrder(_)) => {
                        let _ = pair.update_bid_state(OrderState::Cancelled);
                    }
                    Ok(false) | Err(_) => success = false,
                }
            }
        }

        if let Some(order_id) = pair.ask_order_id.clone() {
            if !pair.ask_state.is_done() {
                match self.client.cancel_order(order_id).await {
                    Ok(true) | Err(VenueError::UnknownOrder(_)) => {
                        let _ = pair.update_ask_state(OrderState::Cancelled);
                    }
                    Ok(false) | Err(_) => success = false,
                }
            }
        }

        success
    }

    /// Cancel the old pair outright and place a fresh one.
    pub async fn requote(
        &mut self,
        pair: &mut QuotePair,
        req: QuoteRequest,
    ) -> Option<QuotePair> {
        self.cancel_quote_pair(pair).await;
        self.place_quote_pair(req).await
    }

    /// Requote while preserving hanging orders.
    ///
    /// Partially filled sides are never touched: they keep their order
    /// id, price and queue position in the new pair. A live side is
    /// cancelled and replaced only when its price moved at least the
    /// cancel threshold; an unmoved live order is carried over as-is.
    /// UNKNOWN sides are treated like live ones, since their orders may
    /// still rest on the book: cancelled when moved, carried otherwise
    /// so the next reconcile keeps polling them. Returns `None` when
    /// the new pair ends up with no orders at all.
    pub async fn requote_preserving_hanging(
        &mut self,
        pair: &mut QuotePair,
        req: QuoteRequest,
    ) -> Option<QuotePair> {
        let bid_moved =
            (pair.bid_price.inner() - req.bid_price.inner()).abs() >= REQUOTE_CANCEL_THRESHOLD;
        let ask_moved =
            (pair.ask_price.inner() - req.ask_price.inner()).abs() >= REQUOTE_CANCEL_THRESHOLD;

        let mut cancel_bid = pair.bid_order_id.is_some()
            && matches!(pair.bid_state, OrderState::Live | OrderState::Unknown)
            && bid_moved;
        let mut cancel_ask = pair.ask_order_id.is_some()
            && matches!(pair.ask_state, OrderState::Live | OrderState::Unknown)
            && ask_moved;

        if cancel_bid {
            if let Some(order_id) = pair.bid_order_id.clone() {
                match self.client.cancel_order(order_id).await {
                    Ok(true) | Err(VenueError::UnknownOrder(_)) => {
                        let _ = pair.update_bid_state(OrderState::Cancelled);
                    }
                    Ok(false) | Err(_) => {
                        debug!(market = %pair.market_id.short(), "bid cancel refused, keeping order");
                        cancel_bid = false;
                    }
                }
            }
        }
        if cancel_ask {
            if let Some(order_id) = pair.ask_order_id.clone() {
                match self.client.cancel_order(order_id).await {
                    Ok(true) | Err(VenueError::UnknownOrder(_)) => {
                        let _ = pair.update_ask_state(OrderState::Cancelled);
                    }
                    Ok(false) | Err(_) => {
                        debug!(market = %pair.market_id.short(), "ask cancel refused, keeping order");
                        cancel_ask = false;
                    }
                }
            }
        }

        let mut new_pair = QuotePair::new(
            req.market_id.clone(),
            req.token_id.clone(),
            req.bid_price,
            req.ask_price,
            req.bid_size,
            req.ask_size,
        );
        new_pair.no_token_id = req.no_token_id.clone();
        new_pair.condition_id = req.condition_id.clone();
        new_pair.quoted_mid = req.quoted_mid;
        new_pair.bid_state = OrderState::Cancelled;
        new_pair.ask_state = OrderState::Cancelled;

        // Bid side: keep a hanging or unmoved order, otherwise replace.
        if !cancel_bid
            && pair.bid_order_id.is_some()
            && matches!(
                pair.bid_state,
                OrderState::Partial | OrderState::Live | OrderState::Unknown
            )
        {
            new_pair.bid_order_id = pair.bid_order_id.clone();
            new_pair.bid_state = pair.bid_state;
            new_pair.bid_price = pair.bid_price;
            new_pair.bid_size = pair.bid_size;
        } else if req.place_bid && cancel_bid {
            if let Ok(order_id) = self
                .place_single(&req.token_id, req.bid_price, req.bid_size, Side::Buy)
                .await
            {
                new_pair.bid_order_id = Some(order_id);
                new_pair.bid_state = OrderState::New;
            }
        }

        // Ask side, same policy.
        if !cancel_ask
            && pair.ask_order_id.is_some()
            && matches!(
                pair.ask_state,
                OrderState::Partial | OrderState::Live | OrderState::Unknown
            )
        {
            new_pair.ask_order_id = pair.ask_order_id.clone();
            new_pair.ask_state = pair.ask_state;
            new_pair.ask_price = pair.ask_price;
            new_pair.ask_size = pair.ask_size;
        } else if req.place_ask && cancel_ask {
            if let Ok(order_id) = self
                .place_single(&req.token_id, req.ask_price, req.ask_size, Side::Sell)
                .await
            {
                new_pair.ask_order_id = Some(order_id);
                new_pair.ask_state = OrderState::New;
            }
        }

        if new_pair.bid_order_id.is_some() || new_pair.ask_order_id.is_some() {
            Some(new_pair)
        } else {
            None
        }
    }

    /// Poll the venue for both sides of a pair and apply state
    /// transitions. Emits a fill record the first time a side reaches
    /// FILLED; a side already marked filled is never re-reported.
    pub async fn reconcile_quote(&self, pair: &mut QuotePair) -> Vec<FillRecord> {
        let mut fills = Vec::new();

        // Unknown sides are re-polled too: the state machine recovers from
        // Unknown once the venue answers again.
        if let Some(order_id) = pair.bid_order_id.clone() {
            if pair.bid_state.is_open() || pair.bid_state == OrderState::Unknown {
                match self.client.order_status(order_id.clone()).await {
                    Ok(report) => {
                        let state = report.state();
                        if report.is_filled || state == OrderState::Filled {
                            if pair.update_bid_state(OrderState::Filled)
                                == Ok(omm_core::Transition::Applied)
                            {
                                fills.push(FillRecord {
                                    market_id: pair.market_id.clone(),
                                    token_id: pair.token_id.clone(),
                                    order_id,
                                    side: Side::Buy,
                                    price: report.avg_fill_price.unwrap_or(pair.bid_price),
                                    size_matched: if report.size_matched > Decimal::ZERO {
                                        report.size_matched
                                    } else {
                                        pair.bid_size.inner()
                                    },
                                    detected_at: Utc::now(),
                                });
                            }
                        } else if report.size_matched > Decimal::ZERO {
                            let _ = pair.update_bid_state(OrderState::Partial);
                        } else {
                            let _ = pair.update_bid_state(state);
                        }
                    }
                    Err(err) => {
                        debug!(market = %pair.market_id.short(), %err, "bid status unavailable");
                        let _ = pair.update_bid_state(OrderState::Unknown);
                    }
                }
            }
        }

        if let Some(order_id) = pair.ask_order_id.clone() {
            if pair.ask_state.is_open() || pair.ask_state == OrderState::Unknown {
                match self.client.order_status(order_id.clone()).await {
                    Ok(report) => {
                        let state = report.state();
                        if report.is_filled || state == OrderState::Filled {
                            if pair.update_ask_state(OrderState::Filled)
                                == Ok(omm_core::Transition::Applied)
                            {
                                fills.push(FillRecord {
                                    market_id: pair.market_id.clone(),
                                    token_id: pair.token_id.clone(),
                                    order_id,
                                    side: Side::Sell,
                                    price: report.avg_fill_price.unwrap_or(pair.ask_price),
                                    size_matched: if report.size_matched > Decimal::ZERO {
                                        report.size_matched
                                    } else {
                                        pair.ask_size.inner()
                                    },
                                    detected_at: Utc::now(),
                                });
                            }
                        } else if report.size_matched > Decimal::ZERO {
                            let _ = pair.update_ask_state(OrderState::Partial);
                        } else {
                            let _ = pair.update_ask_state(state);
                        }
                    }
                    Err(err) => {
                        debug!(market = %pair.market_id.short(), %err, "ask status unavailable");
                        let _ = pair.update_ask_state(OrderState::Unknown);
                    }
                }
            }
        }

        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omm_venue::MockVenue;

    fn request() -> QuoteRequest {
        QuoteRequest {
            market_id: MarketId::new("mkt-1"),
            token_id: TokenId::new("tok-yes"),
            no_token_id: None,
            condition_id: None,
            bid_price: Price::new(dec!(0.48)),
            ask_price: Price::new(dec!(0.52)),
            bid_size: Size::new(dec!(10)),
            ask_size: Size::new(dec!(10)),
            quoted_mid: Price::new(dec!(0.50)),
            place_bid: true,
            place_ask: true,
        }
    }

    fn quoter(venue: Arc<MockVenue>) -> Quoter<MockVenue> {
        Quoter::new(venue, true)
    }

    #[tokio::test]
    async fn test_place_both_sides() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());

        let pair = q.place_quote_pair(request()).await.unwrap();
        assert_eq!(pair.bid_order_id, Some(OrderId::new("bid-1")));
        assert_eq!(pair.ask_order_id, Some(OrderId::new("ask-1")));
        assert_eq!(pair.bid_state, OrderState::Live);
        assert_eq!(pair.ask_state, OrderState::Live);
        assert_eq!(pair.quoted_mid.inner(), dec!(0.50));
        assert!(q.last_failure().is_none());

        let placements = venue.placements();
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].side, Side::Buy);
        assert!(placements[0].post_only);
    }

    #[tokio::test]
    async fn test_place_bid_only() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        let mut q = quoter(venue.clone());

        let mut req = request();
        req.place_ask = false;
        let pair = q.place_quote_pair(req).await.unwrap();
        assert!(pair.bid_order_id.is_some());
        assert!(pair.ask_order_id.is_none());
        assert_eq!(pair.ask_state, OrderState::Cancelled);
        assert_eq!(venue.placements().len(), 1);
    }

    #[tokio::test]
    async fn test_one_side_rejected_still_returns_pair() {
        let venue = Arc::new(MockVenue::new());
        venue.push_place_result(Err(VenueError::Rejected("would cross".to_string())));
        venue.push_order_id("ask-1");
        let mut q = quoter(venue);

        let pair = q.place_quote_pair(request()).await.unwrap();
        assert_eq!(pair.bid_state, OrderState::Cancelled);
        assert_eq!(pair.ask_state, OrderState::Live);
        assert!(q.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_total_failure_latches_diagnostics() {
        let venue = Arc::new(MockVenue::new());
        venue.push_place_result(Err(VenueError::Rejected("would cross".to_string())));
        venue.push_place_result(Err(VenueError::Unavailable("timeout".to_string())));
        let mut q = quoter(venue);

        assert!(q.place_quote_pair(request()).await.is_none());
        let failure = q.last_failure().unwrap();
        assert!(failure.bid_error.as_deref().unwrap().contains("would cross"));
        assert!(failure.ask_error.as_deref().unwrap().contains("timeout"));
        assert!(failure.place_bid && failure.place_ask);
    }

    #[tokio::test]
    async fn test_failure_cleared_on_next_attempt() {
        let venue = Arc::new(MockVenue::new());
        venue.push_place_result(Err(VenueError::Rejected("x".to_string())));
        venue.push_place_result(Err(VenueError::Rejected("x".to_string())));
        let mut q = quoter(venue.clone());
        assert!(q.place_quote_pair(request()).await.is_none());
        assert!(q.last_failure().is_some());

        venue.push_order_id("bid-2");
        venue.push_order_id("ask-2");
        assert!(q.place_quote_pair(request()).await.is_some());
        assert!(q.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_cancel_open_sides() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        assert!(q.cancel_quote_pair(&mut pair).await);
        assert_eq!(pair.bid_state, OrderState::Cancelled);
        assert_eq!(pair.ask_state, OrderState::Cancelled);
        assert_eq!(venue.cancels().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_refused_keeps_state() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        venue.set_cancel_result(Ok(false));
        assert!(!q.cancel_quote_pair(&mut pair).await);
        // Refused cancel: still live, reconciliation will catch the race.
        assert_eq!(pair.bid_state, OrderState::Live);
    }

    #[tokio::test]
    async fn test_cancel_covers_unknown_sides() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        // No scripted statuses: reconcile marks both sides UNKNOWN.
        q.reconcile_quote(&mut pair).await;
        assert_eq!(pair.bid_state, OrderState::Unknown);
        assert_eq!(pair.ask_state, OrderState::Unknown);

        // Both orders may still rest on the book and must be cancelled.
        assert!(q.cancel_quote_pair(&mut pair).await);
        assert_eq!(venue.cancels().len(), 2);
        assert_eq!(pair.bid_state, OrderState::Cancelled);
        assert_eq!(pair.ask_state, OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_unknown_side_refused_returns_false() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();
        q.reconcile_quote(&mut pair).await;

        venue.set_cancel_result(Ok(false));
        assert!(!q.cancel_quote_pair(&mut pair).await);
        // Unconfirmed: the sides stay UNKNOWN and keep getting polled.
        assert_eq!(pair.bid_state, OrderState::Unknown);
        assert_eq!(pair.ask_state, OrderState::Unknown);
    }

    #[tokio::test]
    async fn test_cancel_treats_unknown_order_reply_as_gone() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        // The venue no longer knows the orders: nothing can be resting.
        venue.set_cancel_result(Err(VenueError::UnknownOrder(OrderId::new("bid-1"))));
        assert!(q.cancel_quote_pair(&mut pair).await);
        assert_eq!(pair.bid_state, OrderState::Cancelled);
        assert_eq!(pair.ask_state, OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_requote_preserves_hanging_partial() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();
        pair.update_bid_state(OrderState::Partial).unwrap();

        let mut req = request();
        req.bid_price = Price::new(dec!(0.45));
        req.ask_price = Price::new(dec!(0.55));
        venue.push_order_id("ask-2");

        let new_pair = q.requote_preserving_hanging(&mut pair, req).await.unwrap();
        // Hanging bid kept: old id, old price, still partial.
        assert_eq!(new_pair.bid_order_id, Some(OrderId::new("bid-1")));
        assert_eq!(new_pair.bid_state, OrderState::Partial);
        assert_eq!(new_pair.bid_price.inner(), dec!(0.48));
        // Ask moved: cancelled and replaced.
        assert_eq!(new_pair.ask_order_id, Some(OrderId::new("ask-2")));
        assert_eq!(new_pair.ask_state, OrderState::New);
        assert_eq!(venue.cancels(), vec![OrderId::new("ask-1")]);
    }

    #[tokio::test]
    async fn test_requote_keeps_unmoved_live_order() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        // Bid unchanged, ask moves 3 ticks.
        let mut req = request();
        req.ask_price = Price::new(dec!(0.55));
        venue.push_order_id("ask-2");

        let new_pair = q.requote_preserving_hanging(&mut pair, req).await.unwrap();
        assert_eq!(new_pair.bid_order_id, Some(OrderId::new("bid-1")));
        assert_eq!(new_pair.bid_state, OrderState::Live);
        assert_eq!(new_pair.ask_order_id, Some(OrderId::new("ask-2")));
        // Only the moved side was cancelled.
        assert_eq!(venue.cancels(), vec![OrderId::new("ask-1")]);
    }

    #[tokio::test]
    async fn test_requote_sub_threshold_move_holds() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        // Both sides move under the $0.005 threshold: nothing cancelled.
        let mut req = request();
        req.bid_price = Price::new(dec!(0.481));
        req.ask_price = Price::new(dec!(0.519));

        let new_pair = q.requote_preserving_hanging(&mut pair, req).await.unwrap();
        assert!(venue.cancels().is_empty());
        assert_eq!(new_pair.bid_order_id, Some(OrderId::new("bid-1")));
        assert_eq!(new_pair.ask_order_id, Some(OrderId::new("ask-1")));
    }

    #[tokio::test]
    async fn test_requote_cancels_moved_unknown_side() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();
        pair.update_bid_state(OrderState::Unknown).unwrap();

        // Bid moves past the threshold while its status is unknown: the
        // old order must still be cancelled before the replacement.
        let mut req = request();
        req.bid_price = Price::new(dec!(0.45));
        venue.push_order_id("bid-2");

        let new_pair = q.requote_preserving_hanging(&mut pair, req).await.unwrap();
        assert_eq!(venue.cancels(), vec![OrderId::new("bid-1")]);
        assert_eq!(new_pair.bid_order_id, Some(OrderId::new("bid-2")));
        assert_eq!(new_pair.bid_state, OrderState::New);
        // Unmoved live ask carried over.
        assert_eq!(new_pair.ask_order_id, Some(OrderId::new("ask-1")));
    }

    #[tokio::test]
    async fn test_requote_carries_unmoved_unknown_side() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();
        pair.update_bid_state(OrderState::Unknown).unwrap();

        // Unmoved unknown bid: the order id is carried into the new pair
        // so the next reconcile keeps polling it, never silently dropped.
        let new_pair = q
            .requote_preserving_hanging(&mut pair, request())
            .await
            .unwrap();
        assert!(venue.cancels().is_empty());
        assert_eq!(new_pair.bid_order_id, Some(OrderId::new("bid-1")));
        assert_eq!(new_pair.bid_state, OrderState::Unknown);
    }

    #[tokio::test]
    async fn test_reconcile_emits_fill_once() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        venue.set_status_simple("bid-1", "MATCHED", dec!(10));
        venue.set_status_simple("ask-1", "LIVE", dec!(0));

        let fills = q.reconcile_quote(&mut pair).await;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].side, Side::Buy);
        assert_eq!(fills[0].size_matched, dec!(10));
        assert_eq!(fills[0].price.inner(), dec!(0.48));
        assert_eq!(pair.bid_state, OrderState::Filled);

        // Second pass: the filled bid is not re-reported.
        let fills = q.reconcile_quote(&mut pair).await;
        assert!(fills.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_partial_fill() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        venue.set_status_simple("bid-1", "LIVE", dec!(4));
        venue.set_status_simple("ask-1", "LIVE", dec!(0));

        let fills = q.reconcile_quote(&mut pair).await;
        assert!(fills.is_empty());
        assert_eq!(pair.bid_state, OrderState::Partial);
        assert_eq!(pair.ask_state, OrderState::Live);
    }

    #[tokio::test]
    async fn test_reconcile_fill_after_cancel_race() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        // Cancel issued, then the venue reports the bid actually filled.
        q.cancel_quote_pair(&mut pair).await;
        assert_eq!(pair.bid_state, OrderState::Cancelled);

        venue.set_status_simple("bid-1", "MATCHED", dec!(10));
        // Cancelled is not an open state, so reconcile skips it; the
        // CANCELLED -> FILLED transition is applied by the caller when the
        // venue pushes the late fill.
        let applied = pair.update_bid_state(OrderState::Filled);
        assert!(applied.is_ok());
        assert_eq!(pair.bid_state, OrderState::Filled);
    }

    #[tokio::test]
    async fn test_reconcile_status_error_marks_unknown() {
        let venue = Arc::new(MockVenue::new());
        venue.push_order_id("bid-1");
        venue.push_order_id("ask-1");
        let mut q = quoter(venue.clone());
        let mut pair = q.place_quote_pair(request()).await.unwrap();

        // No scripted status: both lookups fail.
        let fills = q.reconcile_quote(&mut pair).await;
        assert!(fills.is_empty());
        assert_eq!(pair.bid_state, OrderState::Unknown);
        assert_eq!(pair.ask_state, OrderState::Unknown);

        // Next cycle the venue recovers and reports the order live again.
        venue.set_status_simple("bid-1", "LIVE", dec!(0));
        venue.set_status_simple("ask-1", "MATCHED", dec!(10));
        let fills = q.reconcile_quote(&mut pair).await;
        assert_eq!(pair.bid_state, OrderState::Live);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].side, Side::Sell);
    }
}
