//! Market metadata and per-symbol trading rules.
//!
//! A `Market` is immutable per symbol/venue: currencies, price and quantity
//! grids, and the exchange minimums that gate order submission.

use crate::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-symbol market specification from a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Trading pair symbol (e.g. "BTCUSDT").
    pub symbol: String,

    /// Base currency (e.g. "BTC").
    pub base_currency: String,

    /// Quote currency (e.g. "USDT").
    pub quote_currency: String,

    /// Minimum price increment.
    pub tick_size: Price,

    /// Minimum quantity increment.
    pub step_size: Size,

    /// Minimum order quantity.
    pub min_quantity: Size,

    /// Minimum order notional in quote currency.
    pub min_notional: Decimal,

    /// Decimal places for prices.
    pub price_precision: u32,

    /// Decimal places for quantities.
    pub quantity_precision: u32,
}

impl Market {
    /// Snap a price to the tick grid by truncation.
    pub fn truncate_price(&self, price: Price) -> Price {
        price.truncate_to_tick(self.tick_size)
    }

    /// Snap a quantity to the step grid by truncation (never rounds up).
    pub fn truncate_quantity(&self, quantity: Size) -> Size {
        quantity.truncate_to_step(self.step_size)
    }

    /// Whether an order of this quantity at this price clears the venue
    /// minimums.
    pub fn is_dust(&self, quantity: Size, price: Price) -> bool {
        quantity < self.min_quantity || quantity.notional(price) < self.min_notional
    }
}
