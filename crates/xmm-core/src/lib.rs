//! Core domain types for the cross-exchange market-making engine.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Price`, `Size`: precision-safe decimal newtypes
//! - `Market`: per-symbol trading rules (tick size, step size, minimums)
//! - `Balance`, `Account`: session balance façade
//! - `Order`, `SubmitOrder`, `Trade`: order and execution types
//! - `OrderBookSnapshot`: depth snapshot with validity checks

pub mod balance;
pub mod book;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod trade;

pub use balance::{Account, Balance};
pub use book::{BookSide, BookValidity, OrderBookSnapshot, PriceVolume};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::Market;
pub use order::{
    ExchangeName, MarginSideEffect, Order, OrderId, OrderSide, OrderStatus, OrderType,
    SubmitOrder, TimeInForce,
};
pub use trade::{Trade, TradeId, TradeKey};
