//! Last-price table for valuing balances in quote currency.

use dashmap::DashMap;
use rust_decimal::Decimal;
use xmm_core::Price;

/// Simple price solver: a table of last prices keyed by symbol, with a
/// one-hop lookup from a currency to the quote currency.
#[derive(Debug, Default)]
pub struct SimplePriceSolver {
    last_prices: DashMap<String, Price>,
}

impl SimplePriceSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the last price of a symbol (e.g. "BTCUSDT").
    pub fn update(&self, symbol: impl Into<String>, price: Price) {
        self.last_prices.insert(symbol.into(), price);
    }

    pub fn last_price(&self, symbol: &str) -> Option<Price> {
        self.last_prices.get(symbol).map(|p| *p)
    }

    /// Price of one unit of `currency` in `quote`.
    ///
    /// The quote currency itself prices at one; other currencies resolve via
    /// the `{currency}{quote}` symbol. Returns `None` when no such price is
    /// known — callers decide whether that is a zero contribution or an
    /// error.
    pub fn price_of(&self, currency: &str, quote: &str) -> Option<Decimal> {
        if currency == quote {
            return Some(Decimal::ONE);
        }
        self.last_prices
            .get(&format!("{currency}{quote}"))
            .map(|p| p.inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_currency_prices_at_one() {
        let solver = SimplePriceSolver::new();
        assert_eq!(solver.price_of("USDT", "USDT"), Some(dec!(1)));
    }

    #[test]
    fn test_symbol_lookup() {
        let solver = SimplePriceSolver::new();
        solver.update("BTCUSDT", Price::new(dec!(98000)));

        assert_eq!(solver.price_of("BTC", "USDT"), Some(dec!(98000)));
        assert_eq!(solver.price_of("ETH", "USDT"), None);
    }
}
