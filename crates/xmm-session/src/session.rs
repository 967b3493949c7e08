//! The session contract venue adapters implement.
//!
//! Sessions are dependency-injected trait objects so the strategy can be
//! exercised against mock venues in tests. Adapters own authentication,
//! transport, and stream decoding; the engine only sees typed calls and
//! typed events.

use crate::error::Result;
use crate::events::{MarketDataEvent, UserDataEvent};
use crate::SessionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use xmm_core::{Account, Market, Order, OrderId, SubmitOrder, Trade};

/// Per-order rejection inside a batch submission.
#[derive(Debug, Clone)]
pub struct OrderReject {
    /// Index into the submitted batch.
    pub index: usize,
    pub reason: SessionError,
}

/// Outcome of a batch submission. Partial success is allowed: accepted
/// orders are live even when siblings were rejected.
#[derive(Debug, Clone, Default)]
pub struct BatchSubmitOutcome {
    pub accepted: Vec<Order>,
    pub rejected: Vec<OrderReject>,
}

impl BatchSubmitOutcome {
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Optional trade-history capability of a session.
///
/// Exposed as a dedicated method on [`TradingSession`] instead of a runtime
/// type probe; sessions without history simply return `None`.
#[async_trait]
pub trait TradeHistoryService: Send + Sync {
    /// Trades for the symbol since the given instant, oldest first.
    async fn query_trades_since(&self, symbol: &str, since: DateTime<Utc>) -> Result<Vec<Trade>>;
}

/// A logical venue session.
#[async_trait]
pub trait TradingSession: Send + Sync {
    /// Session key (e.g. "binance", "max").
    fn name(&self) -> &str;

    /// Market metadata for a symbol, if the venue lists it.
    fn market(&self, symbol: &str) -> Option<Market>;

    /// Current account snapshot (balances, fee rates, margin level). The
    /// adapter keeps this current from account-update events.
    fn account(&self) -> Account;

    /// Submit a batch of orders. Per-order status is reported; partial
    /// success does not fail the call.
    async fn submit_orders(&self, orders: Vec<SubmitOrder>) -> Result<BatchSubmitOutcome>;

    /// Best-effort, idempotent cancel.
    async fn cancel_orders(&self, symbol: &str, ids: Vec<OrderId>) -> Result<()>;

    /// Query one order; used to resolve updates referencing unknown orders.
    async fn query_order(&self, id: OrderId) -> Result<Order>;

    /// Open (non-terminal) orders for the symbol.
    async fn query_open_orders(&self, symbol: &str) -> Result<Vec<Order>>;

    /// Book snapshots, updates, and klines.
    fn market_data_stream(&self) -> broadcast::Receiver<MarketDataEvent>;

    /// Order-status transitions and trade executions for the account.
    fn user_data_stream(&self) -> broadcast::Receiver<UserDataEvent>;

    /// Trade-history capability, when the venue supports it.
    fn trade_history(&self) -> Option<Arc<dyn TradeHistoryService>> {
        None
    }
}
