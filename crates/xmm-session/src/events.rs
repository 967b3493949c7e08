//! Event types emitted by session streams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xmm_core::{Balance, Order, OrderBookSnapshot, Price, PriceVolume, Trade};

/// One candlestick from a venue kline stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub symbol: String,
    /// Interval string as the venue names it (e.g. "1m").
    pub interval: String,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// True once the candle is final.
    pub closed: bool,
    pub close_time: DateTime<Utc>,
}

/// Market-data stream events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketDataEvent {
    /// Full depth snapshot; resets the shared book.
    BookSnapshot(OrderBookSnapshot),
    /// Incremental depth update.
    BookUpdate {
        symbol: String,
        bids: Vec<PriceVolume>,
        asks: Vec<PriceVolume>,
        /// Venue sequence number, where the venue provides one.
        sequence: Option<u64>,
    },
    Kline(Kline),
    /// The upstream connection dropped; sequence state must be discarded.
    Disconnected,
}

/// User-data stream events for the authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserDataEvent {
    OrderUpdate(Order),
    TradeUpdate(Trade),
    BalanceSnapshot(Vec<Balance>),
    BalanceUpdate(Vec<Balance>),
}
