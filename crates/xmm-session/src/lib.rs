//! Venue session contract and order bookkeeping.
//!
//! The engine never talks to an exchange directly: it consumes a pair of
//! [`TradingSession`] trait objects provided by the outer layer. This crate
//! defines that contract, the market-data and user-data event types the
//! sessions emit, and the order-side bookkeeping shared by the strategy
//! loops (order store, active maker orders).

pub mod active_orders;
pub mod error;
pub mod events;
pub mod order_store;
pub mod session;

pub use active_orders::ActiveOrderBook;
pub use error::{Result, SessionError};
pub use events::{Kline, MarketDataEvent, UserDataEvent};
pub use order_store::OrderStore;
pub use session::{BatchSubmitOutcome, OrderReject, TradeHistoryService, TradingSession};
