//! Startup profit/position reconciliation.
//!
//! Replays the merged, time-ordered trade history of every registered venue
//! from a checkpoint into a fresh position and profit-stats pair. Used on
//! restart when the persisted state is suspect.

use crate::position::Position;
use crate::profit::{Profit, ProfitStats};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use xmm_core::Trade;
use xmm_session::TradeHistoryService;

/// Rebuilds position and profit stats from venue trade history.
#[derive(Default)]
pub struct ProfitFixer {
    services: Vec<(String, Arc<dyn TradeHistoryService>)>,
}

impl ProfitFixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a venue's trade history under its session name.
    pub fn add_exchange(&mut self, name: impl Into<String>, service: Arc<dyn TradeHistoryService>) {
        self.services.push((name.into(), service));
    }

    /// Replay all venues' trades in `[since, until]` into the given state.
    pub async fn fix(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        position: &mut Position,
        stats: &mut ProfitStats,
    ) -> Result<usize> {
        let mut trades: Vec<Trade> = Vec::new();
        for (name, service) in &self.services {
            let venue_trades = service.query_trades_since(symbol, since).await?;
            info!(session = %name, count = venue_trades.len(), "loaded trades for replay");
            trades.extend(venue_trades.into_iter().filter(|t| t.time <= until));
        }

        // Cross-venue ordering matters for the cost basis.
        trades.sort_by_key(|t| t.time);

        let count = trades.len();
        for trade in &trades {
            stats.add_trade(trade);
            if let Some(realized) = position.add_trade(trade) {
                stats.add_profit(&Profit {
                    symbol: trade.symbol.clone(),
                    profit: realized.profit,
                    net_profit: realized.net_profit,
                    trade_price: trade.price,
                    trade_quantity: trade.quantity,
                    side: trade.side,
                    exchange: trade.exchange.clone(),
                    fee: trade.fee,
                    fee_currency: trade.fee_currency.clone(),
                    traded_at: trade.time,
                });
            }
        }

        info!(symbol, count, base = %position.base(), "profit fixer replay complete");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use xmm_core::{ExchangeName, Market, OrderId, OrderSide, Price, Size, TradeId};

    struct History(Vec<Trade>);

    #[async_trait]
    impl TradeHistoryService for History {
        async fn query_trades_since(
            &self,
            _symbol: &str,
            since: DateTime<Utc>,
        ) -> xmm_session::Result<Vec<Trade>> {
            Ok(self.0.iter().filter(|t| t.time >= since).cloned().collect())
        }
    }

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

    fn trade(
        id: u64,
        exchange: &str,
        side: OrderSide,
        price: Decimal,
        qty: Decimal,
        at: DateTime<Utc>,
    ) -> Trade {
        Trade {
            id: TradeId(id),
            order_id: OrderId(id),
            exchange: ExchangeName::new(exchange),
            symbol: "BTCUSDT".to_string(),
            side,
            price: Price::new(price),
            quantity: Size::new(qty),
            fee: Decimal::ZERO,
            fee_currency: "USDT".to_string(),
            is_maker: true,
            time: at,
        }
    }

    #[tokio::test]
    async fn test_replays_across_venues_in_time_order() {
        let start = Utc::now() - Duration::hours(2);

        // Maker buys first, source sells later: the fold order decides the
        // realized profit, so venue merge must be time-sorted.
        let maker = History(vec![trade(
            1,
            "maker",
            OrderSide::Buy,
            dec!(100),
            dec!(1),
            start,
        )]);
        let source = History(vec![trade(
            2,
            "source",
            OrderSide::Sell,
            dec!(120),
            dec!(1),
            start + Duration::minutes(10),
        )]);

        let mut fixer = ProfitFixer::new();
        fixer.add_exchange("maker", Arc::new(maker));
        fixer.add_exchange("source", Arc::new(source));

        let mut position = Position::from_market(&market());
        let mut stats = ProfitStats::new("BTCUSDT", ExchangeName::new("maker"));

        let count = fixer
            .fix("BTCUSDT", start - Duration::minutes(1), Utc::now(), &mut position, &mut stats)
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(position.base(), Decimal::ZERO);
        assert_eq!(stats.accumulated_profit, dec!(20));
        assert_eq!(stats.accumulated_trades, 2);
    }
}
