//! Order types, identifiers, and the order status machine.

use crate::{CoreError, Price, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Venue name used to tag orders, trades, and fee schedules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeName(pub String);

impl ExchangeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExchangeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Venue-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns +1 for buy, -1 for sell (for position folding).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
    StopLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::Market => write!(f, "market"),
            Self::StopLimit => write!(f, "stop_limit"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled (resting maker orders).
    #[default]
    #[serde(rename = "GTC")]
    GoodTilCancelled,
    /// Immediate-or-cancel.
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Fill-or-kill.
    #[serde(rename = "FOK")]
    FillOrKill,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTilCancelled => write!(f, "GTC"),
            Self::ImmediateOrCancel => write!(f, "IOC"),
            Self::FillOrKill => write!(f, "FOK"),
        }
    }
}

/// Margin side effect requested with an order on a margin session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginSideEffect {
    /// Spot behavior, no borrowing.
    #[default]
    None,
    /// Borrow automatically to fill the order.
    MarginBuy,
    /// Repay debt automatically with the proceeds.
    AutoRepay,
}

/// Order lifecycle status.
///
/// Terminal statuses (`Filled`, `Canceled`, `Rejected`) are monotonic: once
/// reached, no transition back to `New` or `PartiallyFilled` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::PartiallyFilled => write!(f, "partially_filled"),
            Self::Filled => write!(f, "filled"),
            Self::Canceled => write!(f, "canceled"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Order submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Limit price; ignored for market orders.
    pub price: Price,
    /// Trigger price for stop-limit orders.
    pub stop_price: Option<Price>,
    pub quantity: Size,
    pub time_in_force: TimeInForce,
    pub margin_side_effect: MarginSideEffect,
    /// Client-assigned group id shared by the orders of one strategy
    /// instance.
    pub group_id: u32,
}

impl SubmitOrder {
    /// Notional value of the request in quote currency.
    pub fn notional(&self) -> rust_decimal::Decimal {
        self.quantity.notional(self.price)
    }
}

/// A live order as reported by a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub exchange: ExchangeName,
    #[serde(flatten)]
    pub submit: SubmitOrder,
    pub status: OrderStatus,
    pub executed_quantity: Size,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Apply a status transition from the user-data stream.
    ///
    /// Enforces the two order invariants: `executed ≤ quantity`, and
    /// terminal statuses never regress to open ones.
    pub fn apply_update(
        &mut self,
        status: OrderStatus,
        executed_quantity: Size,
        at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.status.is_terminal() && !status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                order_id: self.id,
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }

        if executed_quantity > self.submit.quantity {
            return Err(CoreError::ExecutedExceedsQuantity {
                order_id: self.id,
                executed: executed_quantity.inner(),
                quantity: self.submit.quantity.inner(),
            });
        }

        self.status = status;
        // Executed quantity is cumulative; never let a late partial-fill
        // event shrink it.
        if executed_quantity > self.executed_quantity {
            self.executed_quantity = executed_quantity;
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Quantity still resting on the book.
    pub fn remaining_quantity(&self) -> Size {
        self.submit.quantity - self.executed_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limit_order(id: u64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId(id),
            exchange: ExchangeName::new("maker"),
            submit: SubmitOrder {
                symbol: "BTCUSDT".to_string(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                price: Price::new(dec!(98000)),
                stop_price: None,
                quantity: Size::new(dec!(1)),
                time_in_force: TimeInForce::GoodTilCancelled,
                margin_side_effect: MarginSideEffect::None,
                group_id: 7,
            },
            status: OrderStatus::New,
            executed_quantity: Size::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_terminal_status_is_monotonic() {
        let mut order = limit_order(1);
        order
            .apply_update(OrderStatus::Filled, Size::new(dec!(1)), Utc::now())
            .unwrap();

        let err = order
            .apply_update(OrderStatus::PartiallyFilled, Size::new(dec!(0.5)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_terminal_to_terminal_is_allowed() {
        // A canceled order may still report a final filled state when the
        // cancel raced a fill.
        let mut order = limit_order(2);
        order
            .apply_update(OrderStatus::Canceled, Size::new(dec!(0.3)), Utc::now())
            .unwrap();
        order
            .apply_update(OrderStatus::Filled, Size::new(dec!(1)), Utc::now())
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_executed_cannot_exceed_quantity() {
        let mut order = limit_order(3);
        let err = order
            .apply_update(OrderStatus::PartiallyFilled, Size::new(dec!(1.5)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::ExecutedExceedsQuantity { .. }));
    }

    #[test]
    fn test_executed_quantity_is_cumulative() {
        let mut order = limit_order(4);
        order
            .apply_update(OrderStatus::PartiallyFilled, Size::new(dec!(0.6)), Utc::now())
            .unwrap();
        // A late event carrying a smaller cumulative fill must not shrink it.
        order
            .apply_update(OrderStatus::PartiallyFilled, Size::new(dec!(0.4)), Utc::now())
            .unwrap();
        assert_eq!(order.executed_quantity.inner(), dec!(0.6));
        assert_eq!(order.remaining_quantity().inner(), dec!(0.4));
    }

    #[test]
    fn test_side_opposite_and_sign() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.sign(), -1);
    }
}
