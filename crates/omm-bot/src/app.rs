//! Market-making loop orchestration.
//!
//! One `MarketMaker` owns every per-market `QuotePair` and is the only
//! mutator of that state. Each cycle: reconcile fills, revalue the
//! portfolio against the drawdown state machine, then quote each
//! configured market through the pricing engine, the proposal pipeline
//! and the risk gate. Reconciliation and inventory updates run even
//! while trading is paused; only order placement is gated.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use omm_core::{BookSummary, FillRecord, MarketId, Price, QuotePair, Side, Size};
use omm_inventory::{InventoryLedger, InventorySnapshot, Leg};
use omm_pricing::{
    compute_as_quotes, compute_bid_ask, compute_dynamic_delta, compute_quote_size, compute_skew,
    estimate_time_remaining, should_requote, KappaEstimator, StaleTracker, VolTracker,
};
use omm_proposal::{
    apply_budget_constraint, apply_event_risk, apply_multi_level, apply_post_only_filter,
    apply_vol_adjustment, create_base_proposal,
};
use omm_quoter::{QuoteFailure, QuoteRequest, Quoter};
use omm_risk::{assess_or_fallback, ApproveAll, RiskAdvisor, RiskManager, RiskMode};
use omm_store::{DailyMetrics, Store};
use omm_venue::{VenueClient, VenueError};

use crate::config::{AppConfig, MarketConfig, MmConfig, PricingMode};
use crate::error::AppResult;

/// Markets with a mid outside this band are skipped; quoting near
/// certainty is all adverse selection.
const EXTREME_MID_LOW: Decimal = dec!(0.02);
const EXTREME_MID_HIGH: Decimal = dec!(0.98);

/// Capital locked by resting orders. Only bids lock collateral up front;
/// asks are covered by held inventory.
fn locked_capital(quotes: &HashMap<MarketId, QuotePair>) -> Decimal {
    quotes
        .values()
        .filter(|pair| pair.bid_order_id.is_some() && pair.bid_state.is_open())
        .map(|pair| pair.bid_size.inner() * pair.bid_price.inner())
        .sum()
}

/// Cooldown for a run of consecutive cross rejects. Zero below the
/// threshold, then the base scaled linearly per full threshold multiple,
/// capped at `max_seconds`.
fn cooldown_seconds_for_streak(
    streak: u32,
    threshold: u32,
    base_seconds: i64,
    max_seconds: i64,
) -> i64 {
    let threshold = threshold.max(1);
    if streak < threshold {
        return 0;
    }
    let level = 1 + i64::from((streak - threshold) / threshold);
    (base_seconds * level).min(max_seconds)
}

/// Whether a total quote failure looks like the venue's post-only cross
/// rejection rather than an outage.
fn is_cross_reject(failure: &QuoteFailure) -> bool {
    let hit = |err: &Option<String>| {
        err.as_deref().is_some_and(|msg| {
            let msg = msg.to_ascii_lowercase();
            msg.contains("cross") || msg.contains("post-only") || msg.contains("post only")
        })
    };
    hit(&failure.bid_error) || hit(&failure.ask_error)
}

/// Anti-churn requote check: the pair must have lived its minimum
/// lifetime and the mid must have moved past the requote threshold.
fn wants_requote(pair: &QuotePair, mid: Price, cfg: &MmConfig) -> bool {
    if pair.age_seconds() < cfg.min_quote_lifetime_seconds as f64 {
        return false;
    }
    should_requote(Some(pair), mid, cfg.requote_threshold_pts)
}

/// The market-making loop. Owns all mutable trading state.
pub struct MarketMaker<C: VenueClient, S: Store> {
    config: AppConfig,
    client: Arc<C>,
    store: Arc<S>,
    quoter: Quoter<C>,
    ledger: InventoryLedger,
    risk: RiskManager,
    advisor: Arc<dyn RiskAdvisor>,
    vol: VolTracker,
    stale: StaleTracker,
    kappa: KappaEstimator,
    active_quotes: HashMap<MarketId, QuotePair>,
    /// Markets where a split failed; not retried until restart.
    split_failed: HashSet<MarketId>,
    cross_reject_streak: HashMap<MarketId, u32>,
    cooldown_until: HashMap<MarketId, DateTime<Utc>>,
    error_count: HashMap<MarketId, u32>,
    circuit_until: HashMap<MarketId, DateTime<Utc>>,
    cycle: u64,
    metrics_day: Option<NaiveDate>,
    day_start_realized: Decimal,
    day_volume: Decimal,
    day_fill_count: u64,
    day_fill_edge_pts: Decimal,
    day_adverse_fills: u64,
}

impl<C: VenueClient, S: Store> MarketMaker<C, S> {
    pub fn new(config: AppConfig, client: Arc<C>, store: Arc<S>) -> Self {
        let quoter = Quoter::new(Arc::clone(&client), config.mm.post_only);
        let ledger = InventoryLedger::new(dec!(0.5));
        let risk = RiskManager::new(config.risk.clone());
        let vol = VolTracker::new(config.mm.vol_halflife);
        let stale = StaleTracker::new(config.mm.stale_threshold_seconds);
        let kappa = KappaEstimator::new(config.mm.kappa_window_minutes, config.avellaneda.kappa);
        Self {
            config,
            client,
            store,
            quoter,
            ledger,
            risk,
            advisor: Arc::new(ApproveAll),
            vol,
            stale,
            kappa,
            active_quotes: HashMap::new(),
            split_failed: HashSet::new(),
            cross_reject_streak: HashMap::new(),
            cooldown_until: HashMap::new(),
            error_count: HashMap::new(),
            circuit_until: HashMap::new(),
            cycle: 0,
            metrics_day: None,
            day_start_realized: Decimal::ZERO,
            day_volume: Decimal::ZERO,
            day_fill_count: 0,
            day_fill_edge_pts: Decimal::ZERO,
            day_adverse_fills: 0,
        }
    }

    /// Swap in a non-default advisory oracle.
    pub fn with_advisor(mut self, advisor: Arc<dyn RiskAdvisor>) -> Self {
        self.advisor = advisor;
        self
    }

    /// Restore cross-restart state: inventory rows and the high-water
    /// mark. Store failures degrade to a cold start.
    pub async fn bootstrap(&mut self) {
        match self.store.load_inventory().await {
            Ok(records) => self.ledger.load_from_store(&records),
            Err(err) => warn!(%err, "failed to load inventory from store, starting flat"),
        }
        match self.store.high_water_mark().await {
            Ok(hwm) if hwm > Decimal::ZERO => {
                self.risk.restore_high_water_mark(hwm);
                info!(%hwm, "restored high-water mark");
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "failed to load high-water mark"),
        }
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(mut self) -> AppResult<()> {
        self.bootstrap().await;
        info!(
            markets = self.config.markets.len(),
            cycle_seconds = self.config.mm.cycle_seconds,
            mode = ?self.config.pricing_mode,
            "MM loop started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.mm.cycle_seconds.max(1)));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Cancel everything open and persist final state.
    async fn shutdown(&mut self) {
        let market_ids: Vec<MarketId> = self.active_quotes.keys().cloned().collect();
        for market_id in market_ids {
            if let Some(mut pair) = self.active_quotes.remove(&market_id) {
                self.quoter.cancel_quote_pair(&mut pair).await;
                if let Err(err) = self.store.upsert_quote(pair).await {
                    warn!(market = %market_id.short(), %err, "failed to persist quote on shutdown");
                }
            }
        }
        self.persist_inventory_snapshots().await;
        info!(
            realized_pnl = %self.ledger.total_realized_pnl(),
            "MM loop stopped"
        );
    }

    /// One quoting cycle.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) {
        self.cycle += 1;
        let diag = self.cycle <= 3 || self.cycle % 100 == 1;
        self.roll_metrics_day(now);

        // Fills and inventory first: capital protection never waits on
        // the risk gate.
        self.reconcile_active_quotes(now).await;

        let balance = match self.client.collateral_balance().await {
            Ok(balance) => balance,
            Err(err) => {
                warn!(%err, "could not fetch collateral balance, skipping cycle");
                return;
            }
        };
        let exposure = self.ledger.total_exposure();
        let portfolio = balance + exposure;

        if let Err(err) = self.store.update_high_water_mark(portfolio).await {
            warn!(%err, "failed to persist high-water mark");
        }

        let mode = self.risk.check_intraday_dd(portfolio, now);
        let paused = self.risk.is_paused() && !self.risk.try_auto_resume(portfolio, now);

        if paused {
            if diag {
                info!("placement paused by risk manager, reconciliation continues");
            }
        } else {
            self.place_quotes(now, balance, exposure, mode, diag).await;
        }

        // Merges reduce exposure, so they run even while paused.
        if self.config.mm.use_split_merge
            && self.cycle % self.config.mm.merge_interval_cycles.max(1) == 0
        {
            self.merge_sweep().await;
        }

        if self.cycle % self.config.mm.reconcile_interval_cycles.max(1) == 0 {
            self.reconcile_inventory_with_store().await;
        }

        self.record_daily_metrics(portfolio, now).await;

        if self.cycle % 10 == 0 {
            info!(
                cycle = self.cycle,
                active_markets = self.active_quotes.len(),
                exposure = %exposure.round_dp(2),
                balance = %balance.round_dp(2),
                realized_pnl = %self.ledger.total_realized_pnl().round_dp(4),
                "MM cycle summary"
            );
        }
    }

    /// Poll order status for every tracked pair, feed fills into the
    /// ledger and the store, and drop terminal pairs.
    async fn reconcile_active_quotes(&mut self, now: DateTime<Utc>) {
        let market_ids: Vec<MarketId> = self.active_quotes.keys().cloned().collect();
        for market_id in market_ids {
            let Some(mut pair) = self.active_quotes.remove(&market_id) else {
                continue;
            };
            let fills = self.quoter.reconcile_quote(&mut pair).await;
            for fill in fills {
                self.apply_fill(&pair, fill, now).await;
            }
            if pair.is_terminal() {
                if let Err(err) = self.store.upsert_quote(pair).await {
                    warn!(market = %market_id.short(), %err, "failed to persist terminal quote");
                }
            } else {
                self.active_quotes.insert(market_id, pair);
            }
        }
    }

    async fn apply_fill(&mut self, pair: &QuotePair, fill: FillRecord, now: DateTime<Utc>) {
        let leg = if pair
            .no_token_id
            .as_ref()
            .is_some_and(|no| *no == fill.token_id)
        {
            Leg::No
        } else {
            Leg::Yes
        };
        self.ledger.process_fill(
            &fill.market_id,
            &fill.token_id,
            leg,
            fill.side,
            fill.price,
            Size::new(fill.size_matched),
        );
        self.kappa
            .record_fill(&fill.market_id, now.timestamp_millis() as u64);
        self.day_volume += fill.size_matched * fill.price.inner();
        self.day_fill_count += 1;

        // Fill quality versus the mid the quote was computed against.
        // A fill through the quoted mid is adverse selection.
        let mut edge_pts = Decimal::ZERO;
        if pair.quoted_mid.is_positive() {
            let edge = match fill.side {
                Side::Buy => pair.quoted_mid.inner() - fill.price.inner(),
                Side::Sell => fill.price.inner() - pair.quoted_mid.inner(),
            };
            edge_pts = edge * dec!(100);
            self.day_fill_edge_pts += edge_pts;
            if edge_pts < Decimal::ZERO {
                self.day_adverse_fills += 1;
            }
        }

        info!(
            market = %fill.market_id.short(),
            side = ?fill.side,
            size = %fill.size_matched,
            price = %fill.price,
            edge_pts = %edge_pts.round_dp(2),
            "MM fill"
        );

        if let Err(err) = self.store.record_fill(fill.clone()).await {
            warn!(market = %fill.market_id.short(), %err, "failed to persist fill");
        }
        self.upsert_market_inventory(&fill.market_id).await;
    }

    /// The placement half of the cycle: budget, books, and one quoting
    /// pass per configured market.
    async fn place_quotes(
        &mut self,
        now: DateTime<Utc>,
        balance: Decimal,
        exposure: Decimal,
        mode: RiskMode,
        diag: bool,
    ) {
        let effective_quote_size = if mode == RiskMode::Reduce {
            if diag {
                warn!("running in reduce mode, quote size halved");
            }
            self.config.mm.quote_size_usd / Decimal::TWO
        } else {
            self.config.mm.quote_size_usd
        };

        let (within_limit, exposure_pct) = self.risk.check_global_exposure(balance, exposure);
        if !within_limit {
            if diag {
                warn!(%exposure_pct, "global exposure above limit, skipping placement");
            }
            return;
        }

        let locked = locked_capital(&self.active_quotes);
        let free_capital = (balance - locked).max(Decimal::ZERO);
        if free_capital < effective_quote_size {
            if diag {
                warn!(
                    free = %free_capital.round_dp(2),
                    locked = %locked.round_dp(2),
                    "free capital too low to quote"
                );
            }
            return;
        }

        let markets = self.config.markets.clone();
        let books = self.fetch_books(&markets).await;

        let mut committed = Decimal::ZERO;
        for market in &markets {
            let Some(book) = books.get(&market.market_id) else {
                continue;
            };
            self.quote_market(
                market,
                book,
                now,
                free_capital,
                &mut committed,
                effective_quote_size,
                diag,
            )
            .await;
        }
    }

    /// Fetch book summaries for all markets, bounded by the scan
    /// concurrency semaphore.
    async fn fetch_books(&self, markets: &[MarketConfig]) -> HashMap<MarketId, BookSummary> {
        let semaphore = Arc::new(Semaphore::new(self.config.mm.scan_concurrency.max(1)));
        let mut tasks = Vec::with_capacity(markets.len());
        for market in markets {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let market_id = market.market_id.clone();
            let token_id = market.token_id.clone();
            tasks.push(async move {
                let permit = semaphore.acquire().await;
                if permit.is_err() {
                    return (
                        market_id,
                        Err(VenueError::Unavailable("semaphore closed".to_string())),
                    );
                }
                let result = client.get_book_summary(token_id).await;
                (market_id, result)
            });
        }

        let mut books = HashMap::new();
        for (market_id, result) in future::join_all(tasks).await {
            match result {
                Ok(book) => {
                    books.insert(market_id, book);
                }
                Err(err) => debug!(market = %market_id.short(), %err, "book fetch failed"),
            }
        }
        books
    }

    #[allow(clippy::too_many_arguments)]
    async fn quote_market(
        &mut self,
        market: &MarketConfig,
        book: &BookSummary,
        now: DateTime<Utc>,
        free_capital: Decimal,
        committed: &mut Decimal,
        effective_quote_size: Decimal,
        diag: bool,
    ) {
        let market_id = &market.market_id;
        let now_ms = now.timestamp_millis() as u64;
        let cfg = self.config.mm.clone();

        if self.in_cooldown(market_id, now) {
            return;
        }

        let Some(mid) = book.weighted_mid() else {
            if diag {
                debug!(market = %market_id.short(), "invalid book, skipping");
            }
            return;
        };
        if mid.inner() < EXTREME_MID_LOW || mid.inner() > EXTREME_MID_HIGH {
            if diag {
                debug!(market = %market_id.short(), %mid, "extreme mid, skipping");
            }
            return;
        }

        self.stale.observe(market_id, mid, now_ms);
        let staleness = self.stale.staleness(market_id, now_ms);
        let tracked_vol = self.vol.update(market_id, mid);
        let spread_pts = book.spread().to_points();
        let vol_for_pricing = if tracked_vol > Decimal::ZERO {
            tracked_vol
        } else {
            (spread_pts / Decimal::TWO).max(Decimal::ONE)
        };

        let capacity = cfg.max_per_market_usd;
        let net_position = self
            .ledger
            .get(market_id)
            .map(|inv| inv.yes_position)
            .unwrap_or(Decimal::ZERO);

        let (bid, ask) = match self.config.pricing_mode {
            PricingMode::Heuristic => {
                let delta = compute_dynamic_delta(
                    vol_for_pricing,
                    book.imbalance(),
                    staleness,
                    &self.config.heuristic,
                );
                let urgency =
                    self.ledger
                        .unwind_urgency(market_id, cfg.max_position_age_hours, now);
                let mut params = self.config.heuristic.clone();
                params.skew_factor += urgency * cfg.urgency_skew_bonus;
                let skew = compute_skew(
                    self.ledger.skew_direction(market_id, capacity) * capacity,
                    capacity,
                    &params,
                );
                compute_bid_ask(mid, delta, skew)
            }
            PricingMode::Avellaneda => {
                let time_remaining = estimate_time_remaining(
                    market.days_to_resolution,
                    cfg.max_days_to_resolution,
                );
                let mut params = self.config.avellaneda.clone();
                params.kappa = self.kappa.kappa(market_id, now_ms);
                let max_inventory_shares = if mid.is_positive() {
                    capacity / mid.inner()
                } else {
                    dec!(100)
                };
                let avg_entry = self
                    .ledger
                    .get(market_id)
                    .map(|inv| inv.yes_avg_entry)
                    .filter(|entry| entry.is_positive());
                compute_as_quotes(
                    mid,
                    net_position,
                    max_inventory_shares,
                    vol_for_pricing,
                    time_remaining,
                    &params,
                    avg_entry,
                )
            }
        };

        if let Err(reject) =
            self.risk
                .validate_mm_quote(bid, ask, mid, self.config.heuristic.delta_max_pts)
        {
            if diag {
                debug!(market = %market_id.short(), %reject, %bid, %ask, %mid, "quote rejected");
            }
            return;
        }

        let opinion = assess_or_fallback(self.advisor.as_ref(), market_id).await;
        if !opinion.approve {
            debug!(market = %market_id.short(), "advisor vetoed market");
            return;
        }

        let at_capacity = self.ledger.is_at_capacity(market_id, capacity, Some(mid));
        let mut place_bid = !at_capacity;
        let mut place_ask = net_position >= cfg.min_order_size;
        let mut net_position = net_position;

        // Bootstrap ask-side inventory by splitting collateral.
        if cfg.two_sided
            && cfg.use_split_merge
            && !place_ask
            && !self.split_failed.contains(market_id)
            && free_capital - *committed >= cfg.split_size_usd
        {
            if let (Some(condition_id), Some(no_token_id)) =
                (&market.condition_id, &market.no_token_id)
            {
                match self
                    .client
                    .split_position(condition_id.clone(), cfg.split_size_usd)
                    .await
                {
                    Ok(true) => {
                        self.ledger.process_split(
                            market_id,
                            cfg.split_size_usd,
                            &market.token_id,
                            no_token_id,
                        );
                        *committed += cfg.split_size_usd;
                        net_position = self
                            .ledger
                            .get(market_id)
                            .map(|inv| inv.yes_position)
                            .unwrap_or(Decimal::ZERO);
                        place_ask = net_position >= cfg.min_order_size;
                        self.upsert_market_inventory(market_id).await;
                    }
                    Ok(false) | Err(_) => {
                        self.split_failed.insert(market_id.clone());
                        warn!(market = %market_id.short(), "split failed, not retried until restart");
                    }
                }
            }
        }

        let mut bid_shares = Decimal::ZERO;
        if place_bid {
            let size_usd = compute_quote_size(
                free_capital - *committed,
                capacity,
                net_position.abs() * mid.inner(),
                capacity,
                effective_quote_size,
            ) * opinion.size_factor;
            if size_usd > Decimal::ZERO && mid.is_positive() {
                bid_shares = (size_usd / mid.inner()).round_dp(1);
            }
            if bid_shares < cfg.min_order_size {
                place_bid = false;
                bid_shares = Decimal::ZERO;
            }
        }

        let mut ask_shares = Decimal::ZERO;
        if place_ask {
            let cap_shares = if mid.is_positive() {
                capacity / mid.inner()
            } else {
                net_position
            };
            ask_shares = net_position.min(cap_shares).round_dp(1);
            if ask_shares < cfg.min_order_size {
                place_ask = false;
                ask_shares = Decimal::ZERO;
            }
        }

        if !place_bid && !place_ask {
            if diag {
                debug!(
                    market = %market_id.short(),
                    at_capacity,
                    net = %net_position,
                    "no sides to quote"
                );
            }
            return;
        }

        let proposal = create_base_proposal(
            market_id,
            &market.token_id,
            bid,
            ask,
            Size::new(if place_bid { bid_shares } else { Decimal::ZERO }),
            Size::new(if place_ask { ask_shares } else { Decimal::ZERO }),
            mid,
            None,
        );
        let proposal =
            apply_multi_level(proposal, cfg.levels, cfg.level_spread_mult, cfg.level_size_mult);
        let proposal = apply_vol_adjustment(proposal, tracked_vol, cfg.vol_widen_threshold_pts);
        let proposal = apply_event_risk(proposal, opinion.event_risk, cfg.event_widen_pct);
        let proposal =
            apply_budget_constraint(proposal, free_capital, *committed, cfg.min_order_size);
        // Post-only clamp runs last so no earlier stage can re-cross.
        let proposal = apply_post_only_filter(proposal, book.best_bid, book.best_ask);

        let bid_order = proposal.best_bid().cloned();
        let ask_order = proposal.best_ask().cloned();
        if bid_order.is_none() && ask_order.is_none() {
            if diag {
                debug!(market = %market_id.short(), "proposal emptied by budget, skipping");
            }
            return;
        }

        let req = QuoteRequest {
            market_id: market_id.clone(),
            token_id: market.token_id.clone(),
            no_token_id: market.no_token_id.clone(),
            condition_id: market.condition_id.clone(),
            bid_price: bid_order.as_ref().map(|o| o.price).unwrap_or(bid),
            ask_price: ask_order.as_ref().map(|o| o.price).unwrap_or(ask),
            bid_size: bid_order.as_ref().map(|o| o.size).unwrap_or(Size::ZERO),
            ask_size: ask_order.as_ref().map(|o| o.size).unwrap_or(Size::ZERO),
            quoted_mid: mid,
            place_bid: bid_order.is_some(),
            place_ask: ask_order.is_some(),
        };

        // Zombie pairs (stuck not-open, not-done) are cancelled outright.
        // An unconfirmed cancel keeps the pair tracked so its order ids
        // stay polled instead of leaking resting orders at the venue.
        let existing = match self.active_quotes.remove(market_id) {
            Some(mut pair) if !pair.is_active() && !pair.is_terminal() => {
                if self.quoter.cancel_quote_pair(&mut pair).await {
                    if let Err(err) = self.store.upsert_quote(pair).await {
                        warn!(market = %market_id.short(), %err, "failed to persist zombie quote");
                    }
                    None
                } else {
                    warn!(
                        market = %market_id.short(),
                        "zombie cancel unconfirmed, keeping pair for next cycle"
                    );
                    self.active_quotes.insert(market_id.clone(), pair);
                    return;
                }
            }
            other => other,
        };

        if let Some(mut pair) = existing {
            let has_bid = pair.bid_order_id.is_some() && pair.bid_state.is_open();
            let has_ask = pair.ask_order_id.is_some() && pair.ask_state.is_open();
            let sides_changed = req.place_bid != has_bid || req.place_ask != has_ask;

            if sides_changed {
                // A side appearing or disappearing needs a full cancel
                // and replace; hanging preservation cannot add a side.
                match self.quoter.requote(&mut pair, req).await {
                    Some(new_pair) => self.track_placed(new_pair, committed).await,
                    None => self.register_quote_failure(market_id, now),
                }
            } else if wants_requote(&pair, mid, &cfg) {
                match self.quoter.requote_preserving_hanging(&mut pair, req).await {
                    Some(new_pair) => self.track_placed(new_pair, committed).await,
                    None => self.register_quote_failure(market_id, now),
                }
            } else {
                // Quote still fresh; leave it resting.
                self.active_quotes.insert(market_id.clone(), pair);
            }
        } else {
            match self.quoter.place_quote_pair(req).await {
                Some(pair) => self.track_placed(pair, committed).await,
                None => self.register_quote_failure(market_id, now),
            }
        }
    }

    /// Account for and persist a freshly placed pair.
    async fn track_placed(&mut self, pair: QuotePair, committed: &mut Decimal) {
        if pair.bid_order_id.is_some() {
            *committed += pair.bid_size.inner() * pair.bid_price.inner();
        }
        let market_id = pair.market_id.clone();
        self.cross_reject_streak.remove(&market_id);
        self.error_count.remove(&market_id);
        self.cooldown_until.remove(&market_id);
        if let Err(err) = self.store.upsert_quote(pair.clone()).await {
            warn!(market = %market_id.short(), %err, "failed to persist quote");
        }
        self.active_quotes.insert(market_id, pair);
    }

    fn in_cooldown(&mut self, market_id: &MarketId, now: DateTime<Utc>) -> bool {
        if let Some(until) = self.cooldown_until.get(market_id) {
            if now < *until {
                return true;
            }
            self.cooldown_until.remove(market_id);
            self.cross_reject_streak.remove(market_id);
        }
        if let Some(until) = self.circuit_until.get(market_id) {
            if now < *until {
                return true;
            }
            self.circuit_until.remove(market_id);
            self.error_count.remove(market_id);
        }
        false
    }

    /// Track a total placement failure: circuit breaker on any error,
    /// escalating cooldown on cross-reject streaks.
    fn register_quote_failure(&mut self, market_id: &MarketId, now: DateTime<Utc>) {
        let cfg = &self.config.mm;
        let errors = self.error_count.entry(market_id.clone()).or_insert(0);
        *errors += 1;
        if *errors >= cfg.circuit_breaker_threshold {
            self.circuit_until.insert(
                market_id.clone(),
                now + chrono::Duration::seconds(cfg.circuit_breaker_cooldown_seconds),
            );
            warn!(
                market = %market_id.short(),
                errors = *errors,
                cooldown_s = cfg.circuit_breaker_cooldown_seconds,
                "circuit breaker opened"
            );
        }

        let cross = self
            .quoter
            .last_failure()
            .filter(|failure| failure.market_id == *market_id)
            .is_some_and(is_cross_reject);
        if !cross {
            self.cross_reject_streak.remove(market_id);
            return;
        }

        let streak = self
            .cross_reject_streak
            .entry(market_id.clone())
            .or_insert(0);
        *streak += 1;
        let streak = *streak;
        let seconds = cooldown_seconds_for_streak(
            streak,
            cfg.cross_reject_threshold,
            cfg.cross_cooldown_seconds,
            cfg.cross_cooldown_max_seconds,
        );
        if seconds <= 0 {
            return;
        }
        let until = now + chrono::Duration::seconds(seconds);
        let entry = self
            .cooldown_until
            .entry(market_id.clone())
            .or_insert(until);
        if until > *entry {
            *entry = until;
        }
        if streak % cfg.cross_reject_threshold.max(1) == 0 {
            warn!(
                market = %market_id.short(),
                streak,
                cooldown_s = seconds,
                "cross-reject cooldown set"
            );
        }
    }

    /// Merge accumulated YES+NO pairs back into collateral.
    async fn merge_sweep(&mut self) {
        let markets = self.config.markets.clone();
        for market in &markets {
            let Some(condition_id) = &market.condition_id else {
                continue;
            };
            let amount = self.ledger.merge_amount(&market.market_id);
            if amount < self.config.mm.merge_threshold {
                continue;
            }
            match self
                .client
                .merge_positions(condition_id.clone(), amount)
                .await
            {
                Ok(true) => {
                    if let Err(err) = self.ledger.process_merge(&market.market_id, amount) {
                        warn!(market = %market.market_id.short(), %err, "merge bookkeeping failed");
                    } else {
                        self.upsert_market_inventory(&market.market_id).await;
                    }
                }
                Ok(false) => {
                    debug!(market = %market.market_id.short(), "venue refused merge");
                }
                Err(err) => {
                    warn!(market = %market.market_id.short(), %err, "merge call failed");
                }
            }
        }
    }

    /// Pull persisted inventory and correct in-memory divergence.
    async fn reconcile_inventory_with_store(&mut self) {
        match self.store.load_inventory().await {
            Ok(records) => {
                let divergences = self.ledger.reconcile_with_store(&records);
                for div in &divergences {
                    warn!(
                        market = %div.market_id.short(),
                        leg = ?div.leg,
                        mem = %div.mem_position,
                        store = %div.store_position,
                        "inventory divergence corrected from store"
                    );
                }
            }
            Err(err) => warn!(%err, "inventory reconciliation skipped, store unavailable"),
        }
    }

    async fn upsert_market_inventory(&self, market_id: &MarketId) {
        let Some(inv) = self.ledger.get(market_id) else {
            return;
        };
        let snapshot = InventorySnapshot {
            market_id: inv.market_id.clone(),
            token_id: inv.token_id.clone(),
            no_token_id: inv.no_token_id.clone(),
            yes_position: inv.yes_position,
            no_position: inv.no_position,
            yes_avg_entry: inv.yes_avg_entry,
            no_avg_entry: inv.no_avg_entry,
            realized_pnl: inv.realized_pnl(),
            mergeable_pairs: inv.mergeable_pairs(),
        };
        if let Err(err) = self.store.upsert_inventory(snapshot).await {
            warn!(market = %market_id.short(), %err, "failed to persist inventory");
        }
    }

    async fn persist_inventory_snapshots(&self) {
        for snapshot in self.ledger.snapshots() {
            let market_id = snapshot.market_id.clone();
            if let Err(err) = self.store.upsert_inventory(snapshot).await {
                warn!(market = %market_id.short(), %err, "failed to persist inventory");
            }
        }
    }

    fn roll_metrics_day(&mut self, now: DateTime<Utc>) {
        let date = now.date_naive();
        if self.metrics_day != Some(date) {
            self.metrics_day = Some(date);
            self.day_start_realized = self.ledger.total_realized_pnl();
            self.day_volume = Decimal::ZERO;
            self.day_fill_count = 0;
            self.day_fill_edge_pts = Decimal::ZERO;
            self.day_adverse_fills = 0;
        }
    }

    async fn record_daily_metrics(&mut self, portfolio: Decimal, now: DateTime<Utc>) {
        let realized_today = self.ledger.total_realized_pnl() - self.day_start_realized;
        let return_pct = if portfolio > Decimal::ZERO {
            (realized_today / portfolio * dec!(100)).round_dp(4)
        } else {
            Decimal::ZERO
        };
        let metrics = DailyMetrics {
            date: now.date_naive(),
            realized_pnl: realized_today,
            return_pct,
            volume: self.day_volume,
            fill_count: self.day_fill_count,
            fill_edge_pts: self.day_fill_edge_pts,
            adverse_fill_count: self.day_adverse_fills,
            portfolio_value: portfolio,
        };
        if let Err(err) = self.store.record_daily_metrics(metrics).await {
            warn!(%err, "failed to persist daily metrics");
        }
    }
}
