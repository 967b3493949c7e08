//! Profit attribution records and cumulative statistics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use xmm_core::{ExchangeName, OrderSide, Price, Size, Trade};

/// One realized-profit attribution, emitted when a trade reduces or flips
/// the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profit {
    pub symbol: String,
    /// Gross realized profit in quote currency.
    pub profit: Decimal,
    /// Profit net of the trade's fee.
    pub net_profit: Decimal,
    pub trade_price: Price,
    pub trade_quantity: Size,
    pub side: OrderSide,
    pub exchange: ExchangeName,
    pub fee: Decimal,
    pub fee_currency: String,
    pub traded_at: DateTime<Utc>,
}

impl fmt::Display for Profit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} profit {} (net {}) on {} {} @ {}",
            self.exchange,
            self.symbol,
            self.profit,
            self.net_profit,
            self.side,
            self.trade_quantity,
            self.trade_price
        )
    }
}

/// Cumulative trading statistics for one strategy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitStats {
    pub symbol: String,
    pub maker_exchange: ExchangeName,

    pub accumulated_profit: Decimal,
    pub accumulated_net_profit: Decimal,
    pub accumulated_base_volume: Decimal,
    pub accumulated_quote_volume: Decimal,
    pub accumulated_trades: u64,
    pub since: DateTime<Utc>,

    pub today_profit: Decimal,
    pub today_net_profit: Decimal,
    today: NaiveDate,
}

impl ProfitStats {
    pub fn new(symbol: impl Into<String>, maker_exchange: ExchangeName) -> Self {
        let now = Utc::now();
        Self {
            symbol: symbol.into(),
            maker_exchange,
            accumulated_profit: Decimal::ZERO,
            accumulated_net_profit: Decimal::ZERO,
            accumulated_base_volume: Decimal::ZERO,
            accumulated_quote_volume: Decimal::ZERO,
            accumulated_trades: 0,
            since: now,
            today_profit: Decimal::ZERO,
            today_net_profit: Decimal::ZERO,
            today: now.date_naive(),
        }
    }

    fn rollover(&mut self, at: DateTime<Utc>) {
        let date = at.date_naive();
        if date != self.today {
            self.today = date;
            self.today_profit = Decimal::ZERO;
            self.today_net_profit = Decimal::ZERO;
        }
    }

    /// Record traded volume.
    pub fn add_trade(&mut self, trade: &Trade) {
        self.rollover(trade.time);
        self.accumulated_trades += 1;
        self.accumulated_base_volume += trade.quantity.inner();
        self.accumulated_quote_volume += trade.notional();
    }

    /// Record a realized-profit attribution.
    pub fn add_profit(&mut self, profit: &Profit) {
        self.rollover(profit.traded_at);
        self.accumulated_profit += profit.profit;
        self.accumulated_net_profit += profit.net_profit;
        self.today_profit += profit.profit;
        self.today_net_profit += profit.net_profit;
    }
}

impl fmt::Display for ProfitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}: accumulated profit {} (net {}), today {} (net {}), {} trades, volume base {} / quote {}",
            self.symbol,
            self.maker_exchange,
            self.accumulated_profit,
            self.accumulated_net_profit,
            self.today_profit,
            self.today_net_profit,
            self.accumulated_trades,
            self.accumulated_base_volume,
            self.accumulated_quote_volume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn profit(amount: Decimal, at: DateTime<Utc>) -> Profit {
        Profit {
            symbol: "BTCUSDT".to_string(),
            profit: amount,
            net_profit: amount - dec!(0.1),
            trade_price: Price::new(dec!(98000)),
            trade_quantity: Size::new(dec!(0.1)),
            side: OrderSide::Sell,
            exchange: ExchangeName::new("maker"),
            fee: dec!(0.1),
            fee_currency: "USDT".to_string(),
            traded_at: at,
        }
    }

    #[test]
    fn test_accumulates_profit() {
        let mut stats = ProfitStats::new("BTCUSDT", ExchangeName::new("maker"));
        let now = Utc::now();

        stats.add_profit(&profit(dec!(10), now));
        stats.add_profit(&profit(dec!(-4), now));

        assert_eq!(stats.accumulated_profit, dec!(6));
        assert_eq!(stats.accumulated_net_profit, dec!(5.8));
        assert_eq!(stats.today_profit, dec!(6));
    }

    #[test]
    fn test_today_resets_on_date_change() {
        let mut stats = ProfitStats::new("BTCUSDT", ExchangeName::new("maker"));
        let now = Utc::now();

        stats.add_profit(&profit(dec!(10), now));
        stats.add_profit(&profit(dec!(3), now + Duration::days(1)));

        assert_eq!(stats.accumulated_profit, dec!(13));
        assert_eq!(stats.today_profit, dec!(3));
    }
}
