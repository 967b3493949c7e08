//! Trade (execution) types.

use crate::{ExchangeName, OrderId, OrderSide, Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Venue-assigned trade identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dedupe key for trades across venues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeKey {
    pub exchange: ExchangeName,
    pub trade_id: TradeId,
}

/// A single execution reported by a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub exchange: ExchangeName,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub fee: Decimal,
    pub fee_currency: String,
    /// True when this execution added liquidity.
    pub is_maker: bool,
    pub time: DateTime<Utc>,
}

impl Trade {
    pub fn key(&self) -> TradeKey {
        TradeKey {
            exchange: self.exchange.clone(),
            trade_id: self.id,
        }
    }

    /// Signed base-quantity change this trade applies to a position:
    /// `+quantity` for buys, `-quantity` for sells.
    pub fn position_change(&self) -> Decimal {
        match self.side {
            OrderSide::Buy => self.quantity.inner(),
            OrderSide::Sell => -self.quantity.inner(),
        }
    }

    /// Notional value in quote currency.
    pub fn notional(&self) -> Decimal {
        self.quantity.notional(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(side: OrderSide, qty: Decimal) -> Trade {
        Trade {
            id: TradeId(1),
            order_id: OrderId(10),
            exchange: ExchangeName::new("source"),
            symbol: "BTCUSDT".to_string(),
            side,
            price: Price::new(dec!(98000)),
            quantity: Size::new(qty),
            fee: dec!(0.1),
            fee_currency: "USDT".to_string(),
            is_maker: false,
            time: Utc::now(),
        }
    }

    #[test]
    fn test_position_change_sign() {
        assert_eq!(trade(OrderSide::Buy, dec!(0.5)).position_change(), dec!(0.5));
        assert_eq!(trade(OrderSide::Sell, dec!(0.5)).position_change(), dec!(-0.5));
    }

    #[test]
    fn test_trade_key_distinguishes_venues() {
        let a = trade(OrderSide::Buy, dec!(1)).key();
        let mut b = trade(OrderSide::Buy, dec!(1));
        b.exchange = ExchangeName::new("maker");
        assert_ne!(a, b.key());
    }
}
