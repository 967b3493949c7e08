//! Core error types.

use crate::OrderId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from core type invariants.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid order status transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: String,
        to: String,
    },

    #[error("executed quantity {executed} exceeds order quantity {quantity} for order {order_id}")]
    ExecutedExceedsQuantity {
        order_id: OrderId,
        executed: Decimal,
        quantity: Decimal,
    },

    #[error("unknown market: {0}")]
    UnknownMarket(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
