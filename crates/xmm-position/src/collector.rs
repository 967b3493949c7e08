//! Trade collector.
//!
//! Joins order events with trade events from both venues. Each accepted
//! trade is folded into the position exactly once; the result is reported as
//! a single batched [`FillEvent`] so subscribers observe the trade, the
//! realized profit, and the updated position together, in that order.
//!
//! The collector is a reducer: it does not know what a fill *means* for the
//! strategy (covered-position updates, circuit-breaker feeding, and
//! notifications are all subscriber concerns). Handlers are registered once
//! at wiring time by the orchestrator.

use crate::position::Position;
use crate::profit::Profit;
use crate::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};
use xmm_core::{ExchangeName, OrderId, Trade, TradeKey};
use xmm_session::{OrderStore, TradeHistoryService};

type OrderRef = (ExchangeName, OrderId);

/// Upper bound on remembered trade keys before the oldest are evicted.
const DONE_TRADES_CAPACITY: usize = 10_000;

/// One folded trade, reported as a single batched emission.
#[derive(Debug, Clone)]
pub struct FillEvent {
    pub trade: Trade,
    /// Realized profit attribution; `None` when the trade only extended the
    /// position.
    pub profit: Option<Profit>,
    /// Position snapshot after the fold.
    pub position: Position,
}

type FillHandler = Box<dyn Fn(&FillEvent) + Send + Sync>;
type RecoverHandler = Box<dyn Fn(&Trade) + Send + Sync>;

/// Collects trades from both venue streams into the position.
pub struct TradeCollector {
    symbol: String,
    position: Arc<Mutex<Position>>,
    order_store: Arc<OrderStore>,

    /// Trades awaiting processing.
    queue: Mutex<VecDeque<Trade>>,
    /// Trades that arrived before their order ack, keyed by venue and
    /// order id.
    pending: Mutex<HashMap<OrderRef, Vec<Trade>>>,
    /// Already-folded trades, with FIFO eviction.
    done: Mutex<DoneTrades>,

    fill_handlers: Mutex<Vec<FillHandler>>,
    recover_handlers: Mutex<Vec<RecoverHandler>>,
}

#[derive(Default)]
struct DoneTrades {
    set: HashSet<TradeKey>,
    order: VecDeque<TradeKey>,
}

impl DoneTrades {
    fn contains(&self, key: &TradeKey) -> bool {
        self.set.contains(key)
    }

    fn insert(&mut self, key: TradeKey) {
        if self.set.insert(key.clone()) {
            self.order.push_back(key);
            while self.order.len() > DONE_TRADES_CAPACITY {
                if let Some(old) = self.order.pop_front() {
                    self.set.remove(&old);
                }
            }
        }
    }
}

impl TradeCollector {
    pub fn new(
        symbol: impl Into<String>,
        position: Arc<Mutex<Position>>,
        order_store: Arc<OrderStore>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            position,
            order_store,
            queue: Mutex::new(VecDeque::new()),
            pending: Mutex::new(HashMap::new()),
            done: Mutex::new(DoneTrades::default()),
            fill_handlers: Mutex::new(Vec::new()),
            recover_handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn position(&self) -> Arc<Mutex<Position>> {
        self.position.clone()
    }

    /// Register a fill subscriber. Handlers run on the processing thread in
    /// registration order.
    pub fn on_fill(&self, handler: impl Fn(&FillEvent) + Send + Sync + 'static) {
        self.fill_handlers.lock().push(Box::new(handler));
    }

    /// Register a recovered-trade subscriber.
    pub fn on_recover(&self, handler: impl Fn(&Trade) + Send + Sync + 'static) {
        self.recover_handlers.lock().push(Box::new(handler));
    }

    /// Enqueue a trade from a user-data stream.
    pub fn receive_trade(&self, trade: Trade) {
        if trade.symbol != self.symbol {
            return;
        }
        self.queue.lock().push_back(trade);
    }

    /// Drain the queue and any parked trades whose orders have appeared.
    ///
    /// Returns the number of trades folded.
    pub fn process(&self) -> usize {
        let mut folded = 0;

        // Parked trades first so executions fold in arrival order once their
        // order ack lands.
        let ready: Vec<Trade> = {
            let mut pending = self.pending.lock();
            let ready_refs: Vec<OrderRef> = pending
                .keys()
                .filter(|(exchange, id)| self.order_store.exists(exchange, *id))
                .cloned()
                .collect();
            ready_refs
                .into_iter()
                .flat_map(|order_ref| pending.remove(&order_ref).unwrap_or_default())
                .collect()
        };
        for trade in ready {
            if self.fold(trade, false) {
                folded += 1;
            }
        }

        loop {
            let Some(trade) = self.queue.lock().pop_front() else {
                break;
            };
            if self.fold(trade, false) {
                folded += 1;
            }
        }

        folded
    }

    /// Fold one trade. Returns true when the position changed.
    fn fold(&self, trade: Trade, recovered: bool) -> bool {
        let key = trade.key();
        if self.done.lock().contains(&key) {
            debug!(trade_id = %trade.id, exchange = %trade.exchange, "skipping duplicate trade");
            return false;
        }

        if !self.order_store.exists(&trade.exchange, trade.order_id) {
            // The execution can outrun the order ack; park it for the next
            // processing round.
            debug!(
                order_id = %trade.order_id,
                exchange = %trade.exchange,
                trade_id = %trade.id,
                "parking trade for unknown order"
            );
            self.pending
                .lock()
                .entry((trade.exchange.clone(), trade.order_id))
                .or_default()
                .push(trade);
            return false;
        }

        let (profit, position) = {
            let mut position = self.position.lock();
            let realized = position.add_trade(&trade);
            let profit = realized.map(|r| Profit {
                symbol: trade.symbol.clone(),
                profit: r.profit,
                net_profit: r.net_profit,
                trade_price: trade.price,
                trade_quantity: trade.quantity,
                side: trade.side,
                exchange: trade.exchange.clone(),
                fee: trade.fee,
                fee_currency: trade.fee_currency.clone(),
                traded_at: trade.time,
            });
            (profit, position.clone())
        };

        self.done.lock().insert(key);

        let event = FillEvent {
            trade,
            profit,
            position,
        };
        for handler in self.fill_handlers.lock().iter() {
            handler(&event);
        }
        if recovered {
            for handler in self.recover_handlers.lock().iter() {
                handler(&event.trade);
            }
        }
        true
    }

    /// Replay historical trades through the same fold, skipping ones already
    /// collected. Returns the number of recovered trades.
    pub async fn recover(
        &self,
        service: &dyn TradeHistoryService,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize> {
        let trades = service.query_trades_since(&self.symbol, since).await?;
        let total = trades.len();

        let mut recovered = 0;
        for trade in trades {
            if self.done.lock().contains(&trade.key()) {
                continue;
            }
            if !self.order_store.exists(&trade.exchange, trade.order_id) {
                // Without the order we cannot attribute the trade; it stays
                // replayable by a later scan once the order is known.
                warn!(
                    order_id = %trade.order_id,
                    trade_id = %trade.id,
                    "skipping recovered trade with unknown order"
                );
                continue;
            }
            if self.fold(trade, true) {
                recovered += 1;
            }
        }

        if recovered > 0 {
            info!(scanned = total, recovered, symbol = %self.symbol, "recovered missing trades");
        }
        Ok(recovered)
    }
}
