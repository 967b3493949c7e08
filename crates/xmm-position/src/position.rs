//! Signed position with average-cost accounting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use xmm_core::{Market, OrderSide, Price, Trade};

/// Realized result of folding one trade into the position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Realized {
    /// Gross realized profit in quote currency.
    pub profit: Decimal,
    /// Profit net of this trade's fee.
    pub net_profit: Decimal,
}

/// Per-symbol position: signed base quantity (positive = long), average cost
/// in quote currency, and accumulated fees per fee currency.
///
/// Created once at strategy start (or restored) and mutated only by the
/// trade collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,

    base: Decimal,
    average_cost: Price,
    accumulated_fees: HashMap<String, Decimal>,
}

impl Position {
    pub fn from_market(market: &Market) -> Self {
        Self {
            symbol: market.symbol.clone(),
            base_currency: market.base_currency.clone(),
            quote_currency: market.quote_currency.clone(),
            base: Decimal::ZERO,
            average_cost: Price::ZERO,
            accumulated_fees: HashMap::new(),
        }
    }

    /// Signed base quantity.
    pub fn base(&self) -> Decimal {
        self.base
    }

    pub fn average_cost(&self) -> Price {
        self.average_cost
    }

    pub fn accumulated_fee(&self, currency: &str) -> Decimal {
        self.accumulated_fees.get(currency).copied().unwrap_or_default()
    }

    /// Restore a persisted position.
    pub fn restore(&mut self, base: Decimal, average_cost: Price) {
        self.base = base;
        self.average_cost = average_cost;
    }

    /// This trade's fee expressed in quote currency. Fees in currencies
    /// other than base/quote are tracked but not netted here.
    fn fee_in_quote(&self, trade: &Trade) -> Decimal {
        if trade.fee_currency == self.quote_currency {
            trade.fee
        } else if trade.fee_currency == self.base_currency {
            trade.fee * trade.price.inner()
        } else {
            Decimal::ZERO
        }
    }

    /// Fold one trade into the position.
    ///
    /// Returns the realized result when the trade reduces or flips the
    /// current exposure; `None` when it only opens or extends it.
    pub fn add_trade(&mut self, trade: &Trade) -> Option<Realized> {
        *self
            .accumulated_fees
            .entry(trade.fee_currency.clone())
            .or_default() += trade.fee;

        let quantity = trade.quantity.inner();
        let price = trade.price.inner();
        let fee = self.fee_in_quote(trade);

        let extends = match trade.side {
            OrderSide::Buy => self.base >= Decimal::ZERO,
            OrderSide::Sell => self.base <= Decimal::ZERO,
        };

        if extends {
            let old_exposure = self.base.abs();
            let new_exposure = old_exposure + quantity;
            self.average_cost = Price::new(
                (self.average_cost.inner() * old_exposure + price * quantity) / new_exposure,
            );
            self.base += trade.position_change();
            return None;
        }

        // Reducing or flipping.
        let exposure = self.base.abs();
        let closed = quantity.min(exposure);
        let profit = match trade.side {
            // Selling against a long: gain when above cost.
            OrderSide::Sell => (price - self.average_cost.inner()) * closed,
            // Buying against a short: gain when below cost.
            OrderSide::Buy => (self.average_cost.inner() - price) * closed,
        };

        self.base += trade.position_change();

        // A flip re-opens the residual at the trade price.
        if quantity > exposure {
            self.average_cost = trade.price;
        } else if self.base.is_zero() {
            self.average_cost = Price::ZERO;
        }

        Some(Realized {
            profit,
            net_profit: profit - fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use xmm_core::{ExchangeName, OrderId, Size, TradeId};

    fn market() -> Market {
        Market {
            symbol: "BTCUSDT".to_string(),
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            tick_size: Price::new(dec!(0.01)),
            step_size: Size::new(dec!(0.00001)),
            min_quantity: Size::new(dec!(0.0001)),
            min_notional: dec!(10),
            price_precision: 2,
            quantity_precision: 5,
        }
    }

    fn trade(id: u64, side: OrderSide, price: Decimal, qty: Decimal) -> Trade {
        Trade {
            id: TradeId(id),
            order_id: OrderId(id),
            exchange: ExchangeName::new("maker"),
            symbol: "BTCUSDT".to_string(),
            side,
            price: Price::new(price),
            quantity: Size::new(qty),
            fee: Decimal::ZERO,
            fee_currency: "USDT".to_string(),
            is_maker: true,
            time: Utc::now(),
        }
    }

    #[test]
    fn test_buys_average_cost() {
        let mut position = Position::from_market(&market());

        assert!(position.add_trade(&trade(1, OrderSide::Buy, dec!(100), dec!(1))).is_none());
        assert!(position.add_trade(&trade(2, OrderSide::Buy, dec!(200), dec!(1))).is_none());

        assert_eq!(position.base(), dec!(2));
        assert_eq!(position.average_cost().inner(), dec!(150));
    }

    #[test]
    fn test_reducing_sell_realizes_profit() {
        let mut position = Position::from_market(&market());
        position.add_trade(&trade(1, OrderSide::Buy, dec!(100), dec!(2)));

        let realized = position
            .add_trade(&trade(2, OrderSide::Sell, dec!(130), dec!(1)))
            .unwrap();
        assert_eq!(realized.profit, dec!(30));
        assert_eq!(position.base(), dec!(1));
        // Cost basis of the remainder is unchanged.
        assert_eq!(position.average_cost().inner(), dec!(100));
    }

    #[test]
    fn test_short_side_profit() {
        let mut position = Position::from_market(&market());
        position.add_trade(&trade(1, OrderSide::Sell, dec!(100), dec!(1)));
        assert_eq!(position.base(), dec!(-1));

        let realized = position
            .add_trade(&trade(2, OrderSide::Buy, dec!(80), dec!(1)))
            .unwrap();
        assert_eq!(realized.profit, dec!(20));
        assert_eq!(position.base(), Decimal::ZERO);
        assert_eq!(position.average_cost(), Price::ZERO);
    }

    #[test]
    fn test_flip_reopens_at_trade_price() {
        let mut position = Position::from_market(&market());
        position.add_trade(&trade(1, OrderSide::Buy, dec!(100), dec!(1)));

        // Sell 3 against long 1: close 1 (profit), open short 2 at 120.
        let realized = position
            .add_trade(&trade(2, OrderSide::Sell, dec!(120), dec!(3)))
            .unwrap();
        assert_eq!(realized.profit, dec!(20));
        assert_eq!(position.base(), dec!(-2));
        assert_eq!(position.average_cost().inner(), dec!(120));
    }

    #[test]
    fn test_fee_nets_against_profit() {
        let mut position = Position::from_market(&market());
        position.add_trade(&trade(1, OrderSide::Buy, dec!(100), dec!(1)));

        let mut sell = trade(2, OrderSide::Sell, dec!(110), dec!(1));
        sell.fee = dec!(0.5);
        let realized = position.add_trade(&sell).unwrap();

        assert_eq!(realized.profit, dec!(10));
        assert_eq!(realized.net_profit, dec!(9.5));
        assert_eq!(position.accumulated_fee("USDT"), dec!(0.5));
    }

    #[test]
    fn test_base_currency_fee_converts_at_trade_price() {
        let mut position = Position::from_market(&market());
        position.add_trade(&trade(1, OrderSide::Buy, dec!(100), dec!(2)));

        let mut sell = trade(2, OrderSide::Sell, dec!(110), dec!(1));
        sell.fee = dec!(0.01);
        sell.fee_currency = "BTC".to_string();
        let realized = position.add_trade(&sell).unwrap();

        // 0.01 BTC at 110 = 1.1 quote
        assert_eq!(realized.net_profit, dec!(10) - dec!(1.1));
    }
}
