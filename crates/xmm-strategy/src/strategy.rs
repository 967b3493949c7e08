//! Strategy orchestrator.
//!
//! `CrossMaker` owns the whole engine: it validates sessions and markets,
//! restores state, binds the streams to the shared book and the trade
//! collector, and runs the quoting loop, the hedging loop, and the optional
//! trade-recovery scanner until shutdown.

use crate::bollinger::BollingerBand;
use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::hedge::{resolve_hedge, HedgeSkip};
use crate::quote::{build_layers, Quote};
use crate::recover;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use xmm_core::{
    ExchangeName, MarginSideEffect, Market, OrderSide, OrderType, Price, SubmitOrder, TimeInForce,
};
use xmm_feed::{PriceHeartbeat, SharedBook, SimplePriceSolver, PRICE_UPDATE_TIMEOUT};
use xmm_position::{FillEvent, Position, ProfitFixer, ProfitStats, TradeCollector};
use xmm_risk::{CircuitBreaker, MarginHedgeGate, QuotaTransaction};
use xmm_session::{
    ActiveOrderBook, MarketDataEvent, OrderStore, TradingSession, UserDataEvent,
};
use xmm_telemetry::metrics;
use xmm_telemetry::{NotifierRef, Reservation, TokenBucket};

/// Jitter added on top of the loop intervals.
const TICKER_JITTER_MS: u64 = 200;

/// Source book depth used for quoting.
const QUOTE_BOOK_DEPTH: usize = 10;

/// FNV-1a, for deriving the stable order group id from the instance id.
fn fnv1a32(s: &str) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// Interval plus 0..max_extra_ms of start-time jitter, so several instances
/// sharing a host do not tick in phase.
fn jitter(base: Duration, max_extra_ms: u64) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    base + Duration::from_millis(u64::from(nanos) % max_extra_ms.max(1))
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// The cross-exchange maker strategy.
pub struct CrossMaker {
    config: StrategyConfig,
    source: Arc<dyn TradingSession>,
    maker: Arc<dyn TradingSession>,
    source_market: Market,
    maker_market: Market,
    group_id: u32,

    book: Arc<SharedBook>,
    boll: Mutex<BollingerBand>,
    price_solver: Arc<SimplePriceSolver>,
    margin_gate: MarginHedgeGate,
    circuit_breaker: Arc<CircuitBreaker>,

    position: Arc<Mutex<Position>>,
    covered_position: Arc<Mutex<Decimal>>,
    profit_stats: Arc<Mutex<ProfitStats>>,
    last_price: Arc<RwLock<Price>>,

    order_store: Arc<OrderStore>,
    active_maker_orders: Arc<ActiveOrderBook>,
    collector: Arc<TradeCollector>,

    notifier: NotifierRef,

    bid_heartbeat: Mutex<PriceHeartbeat>,
    ask_heartbeat: Mutex<PriceHeartbeat>,

    circuit_breaker_alert_limiter: TokenBucket,
    report_profit_limiter: TokenBucket,
    hedge_error_limiter: TokenBucket,
    hedge_error_reservation: Mutex<Option<Reservation>>,

    stop_tx: watch::Sender<bool>,
}

impl CrossMaker {
    /// Construct and wire the strategy. Missing sessions' markets are
    /// config-fatal; everything else is deferred to the loops.
    pub fn new(
        mut config: StrategyConfig,
        source: Arc<dyn TradingSession>,
        maker: Arc<dyn TradingSession>,
        notifier: NotifierRef,
    ) -> Result<Self> {
        config.apply_defaults();
        config.validate()?;

        let source_market =
            source
                .market(&config.symbol)
                .ok_or_else(|| StrategyError::MissingMarket {
                    session: source.name().to_string(),
                    symbol: config.symbol.clone(),
                })?;
        let maker_market =
            maker
                .market(&config.symbol)
                .ok_or_else(|| StrategyError::MissingMarket {
                    session: maker.name().to_string(),
                    symbol: config.symbol.clone(),
                })?;

        let instance_id = format!("xmm:{}", config.symbol);
        let group_id = fnv1a32(&instance_id);
        debug!(group_id, %instance_id, "derived order group id");

        let book = Arc::new(SharedBook::new(config.symbol.clone()));
        let price_solver = Arc::new(SimplePriceSolver::new());
        let margin_gate = MarginHedgeGate::new(
            price_solver.clone(),
            source_market.clone(),
            config.min_margin_level,
        );
        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));

        let position = Arc::new(Mutex::new(Position::from_market(&maker_market)));
        let covered_position = Arc::new(Mutex::new(Decimal::ZERO));
        let profit_stats = Arc::new(Mutex::new(ProfitStats::new(
            config.symbol.clone(),
            ExchangeName::new(maker.name()),
        )));

        let order_store = Arc::new(OrderStore::new());
        let active_maker_orders = Arc::new(ActiveOrderBook::new(config.symbol.clone()));
        let collector = Arc::new(TradeCollector::new(
            config.symbol.clone(),
            position.clone(),
            order_store.clone(),
        ));

        let strategy = Self {
            boll: Mutex::new(BollingerBand::default()),
            bid_heartbeat: Mutex::new(PriceHeartbeat::new("bid", PRICE_UPDATE_TIMEOUT)),
            ask_heartbeat: Mutex::new(PriceHeartbeat::new("ask", PRICE_UPDATE_TIMEOUT)),
            circuit_breaker_alert_limiter: TokenBucket::new(Duration::from_secs(3 * 60), 2),
            report_profit_limiter: TokenBucket::new(Duration::from_secs(5 * 60), 1),
            hedge_error_limiter: TokenBucket::new(Duration::from_secs(60), 1),
            hedge_error_reservation: Mutex::new(None),
            last_price: Arc::new(RwLock::new(Price::ZERO)),
            stop_tx: watch::channel(false).0,
            config,
            source,
            maker,
            source_market,
            maker_market,
            group_id,
            book,
            price_solver,
            margin_gate,
            circuit_breaker,
            position,
            covered_position,
            profit_stats,
            order_store,
            active_maker_orders,
            collector,
            notifier,
        };

        strategy.bind_collector();
        strategy.publish_config_metrics();
        Ok(strategy)
    }

    /// Subscribe the strategy to collector fills: trade notification,
    /// covered-position fold, profit accounting, circuit-breaker feed, and
    /// the position report, in that order per fill.
    fn bind_collector(&self) {
        let source_name = ExchangeName::new(self.source.name());
        let covered = self.covered_position.clone();
        let stats = self.profit_stats.clone();
        let breaker = self.circuit_breaker.clone();
        let notifier = self.notifier.clone();
        let notify_trade = self.config.notify_trade;

        self.collector.on_fill(move |event: &FillEvent| {
            let trade = &event.trade;

            if notify_trade {
                notifier.notify(&format!(
                    "trade: {} {} {} {} @ {}",
                    trade.exchange, trade.symbol, trade.side, trade.quantity, trade.price
                ));
            }

            // Trades on the source venue are hedge executions: they move the
            // covered position by their signed quantity. This is the
            // authoritative covered update; the submission-time bump is only
            // a predictor.
            if trade.exchange == source_name {
                *covered.lock() += trade.position_change();
            }

            let mut stats = stats.lock();
            stats.add_trade(trade);
            if let Some(profit) = &event.profit {
                breaker.record_profit(profit.profit, trade.time);
                stats.add_profit(profit);
                notifier.notify(&profit.to_string());
            }

            info!(
                symbol = %trade.symbol,
                base = %event.position.base(),
                average_cost = %event.position.average_cost(),
                "position updated"
            );
        });

        let notifier = self.notifier.clone();
        self.collector.on_recover(move |trade| {
            notifier.notify(&format!(
                "recovered trade {} on {}: {} {} @ {}",
                trade.id, trade.exchange, trade.side, trade.quantity, trade.price
            ));
        });
    }

    fn publish_config_metrics(&self) {
        let labels = [self.maker.name(), self.config.symbol.as_str()];
        metrics::CONFIG_NUM_LAYERS
            .with_label_values(&labels)
            .set(self.config.num_layers as f64);
        metrics::CONFIG_MAX_EXPOSURE
            .with_label_values(&labels)
            .set(to_f64(self.config.max_exposure_position));
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn position(&self) -> Arc<Mutex<Position>> {
        self.position.clone()
    }

    pub fn covered_position(&self) -> Arc<Mutex<Decimal>> {
        self.covered_position.clone()
    }

    pub fn profit_stats(&self) -> Arc<Mutex<ProfitStats>> {
        self.profit_stats.clone()
    }

    pub fn collector(&self) -> Arc<TradeCollector> {
        self.collector.clone()
    }

    pub fn active_maker_orders(&self) -> Arc<ActiveOrderBook> {
        self.active_maker_orders.clone()
    }

    pub fn shared_book(&self) -> Arc<SharedBook> {
        self.book.clone()
    }

    /// Request shutdown; `run` completes after the loops drain and the
    /// final cancel.
    pub fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Run the strategy until [`shutdown`](Self::shutdown).
    pub async fn run(self: Arc<Self>) -> Result<()> {
        self.run_profit_fixer().await?;

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        tasks.push(tokio::spawn(
            self.clone().market_data_worker(self.stop_tx.subscribe()),
        ));
        tasks.push(tokio::spawn(self.clone().user_data_worker(
            self.source.clone(),
            false,
            self.stop_tx.subscribe(),
        )));
        tasks.push(tokio::spawn(self.clone().user_data_worker(
            self.maker.clone(),
            true,
            self.stop_tx.subscribe(),
        )));
        tasks.push(tokio::spawn(
            self.clone().quote_worker(self.stop_tx.subscribe()),
        ));
        tasks.push(tokio::spawn(
            self.clone().hedge_worker(self.stop_tx.subscribe()),
        ));

        if self.config.recover_trade {
            tasks.push(tokio::spawn(recover::run_scanner(
                self.collector.clone(),
                vec![self.source.clone(), self.maker.clone()],
                self.config.recover_trade_scan_period(),
                self.stop_tx.subscribe(),
            )));
        }

        info!(symbol = %self.config.symbol, "strategy started");

        for task in tasks {
            let _ = task.await;
        }

        // Give in-flight quoting a full interval to settle, then cancel
        // whatever is left on the maker book. The cancel runs under its own
        // deadline so shutdown still completes against a slow venue.
        tokio::time::sleep(self.config.update_interval()).await;
        match tokio::time::timeout(
            self.config.order_cancel_wait_time(),
            self.active_maker_orders.graceful_cancel(self.maker.as_ref()),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(%err, "graceful cancel error"),
            Err(_) => error!("graceful cancel timed out"),
        }

        self.notifier.notify(&format!(
            "shutting down {}: position {}",
            self.config.symbol,
            self.position.lock().base()
        ));
        Ok(())
    }

    async fn run_profit_fixer(&self) -> Result<()> {
        let Some(fixer_config) = &self.config.profit_fixer else {
            return Ok(());
        };

        self.notifier.notify(&format!(
            "fixing {} profit stats and position since {}",
            self.config.symbol, fixer_config.trades_since
        ));

        let mut fixer = ProfitFixer::new();
        if let Some(history) = self.maker.trade_history() {
            fixer.add_exchange(self.maker.name(), history);
        }
        if let Some(history) = self.source.trade_history() {
            fixer.add_exchange(self.source.name(), history);
        }

        let mut position = Position::from_market(&self.maker_market);
        let mut stats = ProfitStats::new(
            self.config.symbol.clone(),
            ExchangeName::new(self.maker.name()),
        );
        fixer
            .fix(
                &self.config.symbol,
                fixer_config.trades_since,
                Utc::now(),
                &mut position,
                &mut stats,
            )
            .await?;

        self.notifier.notify(&format!(
            "fixed {} position: base {}",
            self.config.symbol,
            position.base()
        ));
        *self.position.lock() = position;
        *self.profit_stats.lock() = stats;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stream pumps
    // ------------------------------------------------------------------

    async fn market_data_worker(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let mut stream = self.source.market_data_stream();
        loop {
            tokio::select! {
                _ = stop.changed() => return,
                event = stream.recv() => match event {
                    Ok(MarketDataEvent::BookSnapshot(snapshot)) => {
                        self.book.load_snapshot(snapshot);
                    }
                    Ok(MarketDataEvent::BookUpdate { symbol, bids, asks, sequence }) => {
                        self.book.apply_update(&symbol, &bids, &asks, sequence);
                    }
                    Ok(MarketDataEvent::Kline(kline)) => {
                        if kline.closed
                            && kline.symbol == self.config.symbol
                            && kline.interval == self.config.boll_band_interval
                        {
                            self.boll.lock().update(kline.close);
                        }
                    }
                    Ok(MarketDataEvent::Disconnected) => {
                        warn!(symbol = %self.config.symbol, "market data stream disconnected");
                        self.book.on_disconnect();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "market data receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }

    async fn user_data_worker(
        self: Arc<Self>,
        session: Arc<dyn TradingSession>,
        is_maker: bool,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut stream = session.user_data_stream();
        loop {
            tokio::select! {
                _ = stop.changed() => return,
                event = stream.recv() => match event {
                    Ok(UserDataEvent::OrderUpdate(order)) => {
                        if order.submit.symbol != self.config.symbol {
                            continue;
                        }
                        self.order_store.update(order.clone());
                        if is_maker {
                            self.active_maker_orders.update(&order);
                        }
                        // An update may reference an order the ack never
                        // reached us for; the store insert above makes any
                        // parked trades of that order foldable.
                        self.collector.process();
                    }
                    Ok(UserDataEvent::TradeUpdate(trade)) => {
                        self.collector.receive_trade(trade);
                        self.collector.process();
                    }
                    // The session façade keeps its own balances current.
                    Ok(UserDataEvent::BalanceSnapshot(_)) | Ok(UserDataEvent::BalanceUpdate(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(session = session.name(), skipped, "user data receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Workers
    // ------------------------------------------------------------------

    async fn quote_worker(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let period = jitter(self.config.update_interval(), TICKER_JITTER_MS);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop.changed() => {
                    info!(symbol = %self.config.symbol, "quote worker stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.update_quote().await;
                }
            }
        }
    }

    async fn hedge_worker(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let period = jitter(self.config.hedge_interval(), TICKER_JITTER_MS);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop.changed() => {
                    info!(symbol = %self.config.symbol, "hedge worker stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.hedge_tick().await;
                }
            }
        }
    }

    fn skip_tick(&self, reason: &str) {
        metrics::QUOTE_TICKS_SKIPPED_TOTAL
            .with_label_values(&[self.maker.name(), self.config.symbol.as_str(), reason])
            .inc();
    }

    /// One pass of the quoting loop.
    pub async fn update_quote(&self) {
        let symbol = self.config.symbol.clone();

        // Replace, never stack: the previous layer must be gone before a
        // new one is placed.
        if let Err(err) = self
            .active_maker_orders
            .graceful_cancel(self.maker.as_ref())
            .await
        {
            warn!(%symbol, %err, "some orders not canceled, skipping quoting");
            self.skip_tick("cancel_failed");
            return;
        }

        if let Some(reason) = self.circuit_breaker.is_halted(Utc::now()) {
            warn!(%symbol, %reason, "strategy is halted");
            if self.circuit_breaker_alert_limiter.allow(Instant::now()) {
                self.notifier
                    .notify(&format!("strategy is halted, reason: {reason}"));
            }
            self.skip_tick("halted");
            return;
        }

        let source_book = self.book.copy_depth(QUOTE_BOOK_DEPTH);
        let validity = source_book.validity();
        if !validity.is_valid() {
            warn!(%symbol, %validity, "invalid copied order book, skip quoting");
            self.skip_tick("invalid_book");
            return;
        }
        let Some((best_bid, best_ask)) = source_book.best_bid_and_ask() else {
            self.skip_tick("invalid_book");
            return;
        };

        // Mid-price becomes the strategy's last price.
        let mid = Price::new(
            (best_bid.price.inner() + best_ask.price.inner()) / Decimal::TWO,
        );
        *self.last_price.write() = mid;
        self.price_solver.update(symbol.clone(), mid);

        let now = Instant::now();
        if let Err(err) = self.bid_heartbeat.lock().update(best_bid, now) {
            error!(%symbol, %err, "bid price not updating, skip quoting");
            self.skip_tick("stale_price");
            return;
        }
        if let Err(err) = self.ask_heartbeat.lock().update(best_ask, now) {
            error!(%symbol, %err, "ask price not updating, skip quoting");
            self.skip_tick("stale_price");
            return;
        }

        let mut disable_bid = false;
        let mut disable_ask = false;

        // Maker-side quota: base funds asks, quote funds bids. Balances are
        // re-read each pass; another strategy or a manual order may have
        // spent them since the last tick.
        let maker_account = self.maker.account();
        let mut maker_quota = QuotaTransaction::new();
        if let Some(balance) = maker_account.balance(&self.maker_market.base_currency) {
            if balance.available > self.maker_market.min_quantity.inner() {
                maker_quota.base.add(balance.available);
            } else {
                disable_ask = true;
            }
        }
        if let Some(balance) = maker_account.balance(&self.maker_market.quote_currency) {
            if balance.available > self.maker_market.min_notional {
                maker_quota.quote.add(balance.available);
            } else {
                disable_bid = true;
            }
        }

        // Hedge-side quota: a filled maker bid is hedged by selling base on
        // the source venue, so source base funds bids (and source quote
        // funds asks). Reserve floors come off the top.
        let source_account = self.source.account();
        let mut hedge_quota = QuotaTransaction::new();
        if let Some(balance) = source_account.balance(&self.source_market.base_currency) {
            if self.config.stop_hedge_base_balance > Decimal::ZERO {
                let min_available =
                    self.config.stop_hedge_base_balance + self.source_market.min_quantity.inner();
                if balance.available > min_available {
                    hedge_quota.base.add(balance.available - min_available);
                } else {
                    warn!(%symbol, available = %balance.available, "maker bid disabled: insufficient source base balance");
                    disable_bid = true;
                }
            } else if balance.available > self.source_market.min_quantity.inner() {
                hedge_quota.base.add(balance.available);
            } else {
                warn!(%symbol, available = %balance.available, "maker bid disabled: insufficient source base balance");
                disable_bid = true;
            }
        }
        if let Some(balance) = source_account.balance(&self.source_market.quote_currency) {
            if self.config.stop_hedge_quote_balance > Decimal::ZERO {
                let min_available =
                    self.config.stop_hedge_quote_balance + self.source_market.min_notional;
                if balance.available > min_available {
                    hedge_quota.quote.add(balance.available - min_available);
                } else {
                    warn!(%symbol, available = %balance.available, "maker ask disabled: insufficient source quote balance");
                    disable_ask = true;
                }
            } else if balance.available > self.source_market.min_notional {
                hedge_quota.quote.add(balance.available);
            } else {
                warn!(%symbol, available = %balance.available, "maker ask disabled: insufficient source quote balance");
                disable_ask = true;
            }
        }

        // Inventory cap: too long stops bidding, too short stops asking.
        if self.config.max_exposure_position > Decimal::ZERO {
            let base = self.position.lock().base();
            if base > self.config.max_exposure_position {
                disable_bid = true;
            } else if base < -self.config.max_exposure_position {
                disable_ask = true;
            }
        }

        if disable_bid && disable_ask {
            warn!(%symbol, "bid/ask maker is disabled due to insufficient balances");
            self.skip_tick("balances");
            return;
        }

        let mut quote = Quote {
            best_bid_price: best_bid.price,
            best_ask_price: best_ask.price,
            bid_margin: self.config.bid_margin,
            ask_margin: self.config.ask_margin,
            bid_layer_pips: self.config.pips,
            ask_layer_pips: self.config.pips,
        };

        if self.config.enable_boll_band_margin {
            if !self.apply_boll_band_margin(&mut quote, best_bid.price, best_ask.price) {
                self.skip_tick("boll_warmup");
                return;
            }
        }

        let plan = match build_layers(
            &self.config,
            &self.maker_market,
            &source_book,
            &quote,
            disable_bid,
            disable_ask,
            self.group_id,
            &mut maker_quota,
            &mut hedge_quota,
        ) {
            Ok(plan) => plan,
            Err(err) => {
                error!(%symbol, %err, "layer generation failed");
                return;
            }
        };

        if plan.orders.is_empty() {
            warn!(%symbol, skipped = plan.skipped_layers, "no orders generated");
            self.skip_tick("no_orders");
            return;
        }

        let labels = [self.maker.name(), symbol.as_str()];
        if let Some(price) = plan.top_bid_price {
            metrics::MAKER_BEST_BID_PRICE
                .with_label_values(&labels)
                .set(to_f64(price.inner()));
        }
        if let Some(price) = plan.top_ask_price {
            metrics::MAKER_BEST_ASK_PRICE
                .with_label_values(&labels)
                .set(to_f64(price.inner()));
        }

        match self.maker.submit_orders(plan.orders).await {
            Ok(outcome) => {
                for reject in &outcome.rejected {
                    // A rejected layer never aborts its siblings; its quota
                    // was only ever tentative.
                    warn!(%symbol, index = reject.index, reason = %reject.reason, "maker order rejected");
                }
                for order in outcome.accepted {
                    self.order_store.add(order.clone());
                    self.active_maker_orders.add(order);
                }
                metrics::OPEN_ORDER_BID_EXPOSURE
                    .with_label_values(&labels)
                    .set(to_f64(plan.bid_exposure));
                metrics::OPEN_ORDER_ASK_EXPOSURE
                    .with_label_values(&labels)
                    .set(to_f64(plan.ask_exposure));
            }
            Err(err) => {
                error!(%symbol, %err, "unable to place maker orders");
            }
        }

        self.collector.process();
        self.order_store.prune_terminal(1_000);
    }

    /// Widen the passive side against the Bollinger regime. Returns false
    /// while the band is still warming up.
    fn apply_boll_band_margin(
        &self,
        quote: &mut Quote,
        best_bid: Price,
        best_ask: Price,
    ) -> bool {
        let (up, down) = {
            let boll = self.boll.lock();
            (boll.up_band(), boll.down_band())
        };
        let (Some(up), Some(down)) = (up, down) else {
            warn!(symbol = %self.config.symbol, "bollinger band not ready, skipping");
            return false;
        };
        if up.is_zero() || down.is_zero() {
            warn!(symbol = %self.config.symbol, "bollinger band value is zero, skipping");
            return false;
        }

        debug!(up = %up, down = %down, "bollinger band");

        // Bid under the down band: downtrend. Make the ask harder to lift
        // and spread the layers out.
        if best_bid < down {
            let ratio = down.inner() / best_bid.inner();
            let boll_margin =
                self.config.boll_band_margin * ratio * self.config.boll_band_margin_factor;
            info!(
                symbol = %self.config.symbol,
                %ratio,
                margin = %boll_margin,
                "bollband downtrend: widening ask margin"
            );
            quote.ask_margin += boll_margin;
            quote.bid_layer_pips *= ratio;
            quote.ask_layer_pips *= ratio;
        }

        // Ask above the up band: uptrend. Make the bid harder to hit.
        if best_ask > up {
            let ratio = best_ask.inner() / up.inner();
            let boll_margin =
                self.config.boll_band_margin * ratio * self.config.boll_band_margin_factor;
            info!(
                symbol = %self.config.symbol,
                %ratio,
                margin = %boll_margin,
                "bollband uptrend: widening bid margin"
            );
            quote.bid_margin += boll_margin;
            quote.bid_layer_pips *= ratio;
            quote.ask_layer_pips *= ratio;
        }

        true
    }

    /// One pass of the hedging loop.
    pub async fn hedge_tick(&self) {
        // Fold anything the streams delivered since the last tick before
        // reading the position.
        self.collector.process();

        let base = self.position.lock().base();
        let covered = *self.covered_position.lock();
        let uncovered = base - covered;

        if !self.config.disable_hedge
            && uncovered.abs() > self.source_market.min_quantity.inner()
        {
            info!(
                symbol = %self.config.symbol,
                position = %base,
                covered = %covered,
                uncovered = %uncovered,
                "uncovered position"
            );
            self.hedge(uncovered).await;
        }

        if self.report_profit_limiter.allow(Instant::now()) {
            self.notifier.notify(&self.profit_stats.lock().to_string());
        }
    }

    /// Submit one offsetting market order on the source venue.
    async fn hedge(&self, uncovered: Decimal) {
        let symbol = self.config.symbol.clone();
        let side = if uncovered > Decimal::ZERO {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let last_price = *self.last_price.read();
        let account = self.source.account();

        let margin_quota = if account.margin_enabled {
            let (allowed, quota) = self
                .margin_gate
                .allow_margin_hedge(&account, side, last_price);
            if !allowed {
                warn!(%symbol, %side, "margin hedge denied, skipping");
                return;
            }
            Some(quota)
        } else {
            None
        };

        let top = self.book.copy_depth(1);
        let order = match resolve_hedge(
            uncovered,
            top.best_bid(),
            top.best_ask(),
            last_price,
            &account,
            &self.source_market,
            margin_quota,
        ) {
            Ok(order) => order,
            Err(HedgeSkip::Zero) => return,
            Err(skip) => {
                warn!(%symbol, ?skip, "skipping hedge");
                return;
            }
        };

        // An earlier submission error leaves a reservation; honor its delay
        // before hitting the venue again.
        let reservation = self.hedge_error_reservation.lock().take();
        if let Some(reservation) = reservation {
            if !reservation.ready() {
                self.notifier.notify("hit hedge error rate limit, waiting...");
                tokio::time::sleep(reservation.delay()).await;
            }
        }

        self.notifier.notify(&format!(
            "submitting {} hedge order: {} {}",
            symbol, order.side, order.quantity
        ));

        let submit = SubmitOrder {
            symbol: symbol.clone(),
            side: order.side,
            order_type: OrderType::Market,
            price: order.price,
            stop_price: None,
            quantity: order.quantity,
            time_in_force: TimeInForce::ImmediateOrCancel,
            margin_side_effect: if account.margin_enabled {
                MarginSideEffect::MarginBuy
            } else {
                MarginSideEffect::None
            },
            group_id: self.group_id,
        };

        match self.source.submit_orders(vec![submit]).await {
            Ok(outcome) if !outcome.accepted.is_empty() => {
                for created in &outcome.accepted {
                    debug!(order_id = %created.id, "submitted hedge order");
                    self.order_store.add(created.clone());
                }
                let side_label = match order.side {
                    OrderSide::Buy => "buy",
                    OrderSide::Sell => "sell",
                };
                metrics::HEDGE_ORDERS_TOTAL
                    .with_label_values(&[self.source.name(), symbol.as_str(), side_label])
                    .inc();

                // Predict the covered move so the next tick does not hedge
                // the same inventory twice; the fill events reconcile it.
                let mut covered = self.covered_position.lock();
                match order.side {
                    OrderSide::Sell => *covered += order.quantity.inner(),
                    OrderSide::Buy => *covered -= order.quantity.inner(),
                }
            }
            Ok(outcome) => {
                for reject in &outcome.rejected {
                    error!(%symbol, reason = %reject.reason, "hedge order rejected");
                }
                *self.hedge_error_reservation.lock() =
                    Some(self.hedge_error_limiter.reserve(Instant::now()));
            }
            Err(err) => {
                error!(%symbol, %err, "hedge order submit error");
                *self.hedge_error_reservation.lock() =
                    Some(self.hedge_error_limiter.reserve(Instant::now()));
            }
        }

        self.collector.process();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a32_is_stable() {
        assert_eq!(fnv1a32("xmm:BTCUSDT"), fnv1a32("xmm:BTCUSDT"));
        assert_ne!(fnv1a32("xmm:BTCUSDT"), fnv1a32("xmm:ETHUSDT"));
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(1);
        let jittered = jitter(base, 200);
        assert!(jittered >= base);
        assert!(jittered < base + Duration::from_millis(200));
    }
}
