//! Order-book snapshot types.
//!
//! A snapshot is a pair of price levels per side, bids sorted descending and
//! asks ascending. Validity distinguishes an empty side from a crossed book.

use crate::{OrderSide, Price, Size};
use serde::{Deserialize, Serialize};

/// One price level: price and the volume resting at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceVolume {
    pub price: Price,
    pub volume: Size,
}

impl PriceVolume {
    pub fn new(price: Price, volume: Size) -> Self {
        Self { price, volume }
    }
}

/// Ordered price levels of one side, best first.
pub type BookSide = Vec<PriceVolume>;

/// Snapshot validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookValidity {
    Valid,
    /// One or both sides have no levels.
    Empty,
    /// Best bid is at or above best ask.
    Crossed,
}

impl BookValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl std::fmt::Display for BookValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Empty => write!(f, "empty"),
            Self::Crossed => write!(f, "crossed"),
        }
    }
}

/// A depth snapshot of one symbol's book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Bids sorted by price descending.
    pub bids: BookSide,
    /// Asks sorted by price ascending.
    pub asks: BookSide,
    /// Venue sequence number of the snapshot, where provided.
    pub sequence: Option<u64>,
}

impl OrderBookSnapshot {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn best_bid(&self) -> Option<PriceVolume> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceVolume> {
        self.asks.first().copied()
    }

    /// Both best prices at once; `None` unless both sides are present.
    pub fn best_bid_and_ask(&self) -> Option<(PriceVolume, PriceVolume)> {
        Some((self.best_bid()?, self.best_ask()?))
    }

    /// Levels of one side, best first.
    pub fn side(&self, side: OrderSide) -> &BookSide {
        match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        }
    }

    pub fn validity(&self) -> BookValidity {
        match self.best_bid_and_ask() {
            None => BookValidity::Empty,
            Some((bid, ask)) if bid.price >= ask.price => BookValidity::Crossed,
            Some(_) => BookValidity::Valid,
        }
    }

    /// A copy limited to the top `depth` levels per side.
    pub fn copy_depth(&self, depth: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bids: self.bids.iter().take(depth).copied().collect(),
            asks: self.asks.iter().take(depth).copied().collect(),
            sequence: self.sequence,
        }
    }

    /// Mid price of the touch; `None` unless both sides are present.
    pub fn mid_price(&self) -> Option<Price> {
        let (bid, ask) = self.best_bid_and_ask()?;
        Some(Price::new(
            (bid.price.inner() + ask.price.inner()) / rust_decimal::Decimal::TWO,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pv(price: rust_decimal::Decimal, volume: rust_decimal::Decimal) -> PriceVolume {
        PriceVolume::new(Price::new(price), Size::new(volume))
    }

    fn snapshot() -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: "BTCUSDT".to_string(),
            bids: vec![pv(dec!(1300), dec!(1)), pv(dec!(1200), dec!(2))],
            asks: vec![pv(dec!(1301), dec!(1)), pv(dec!(1400), dec!(2))],
            sequence: Some(10),
        }
    }

    #[test]
    fn test_best_bid_and_ask() {
        let book = snapshot();
        let (bid, ask) = book.best_bid_and_ask().unwrap();
        assert_eq!(bid.price.inner(), dec!(1300));
        assert_eq!(ask.price.inner(), dec!(1301));
        assert_eq!(book.mid_price().unwrap().inner(), dec!(1300.5));
    }

    #[test]
    fn test_validity_empty() {
        let mut book = snapshot();
        book.asks.clear();
        assert_eq!(book.validity(), BookValidity::Empty);
        assert!(!book.validity().is_valid());
    }

    #[test]
    fn test_validity_crossed() {
        let mut book = snapshot();
        book.bids[0].price = Price::new(dec!(1301));
        assert_eq!(book.validity(), BookValidity::Crossed);
    }

    #[test]
    fn test_copy_depth() {
        let book = snapshot();
        let top = book.copy_depth(1);
        assert_eq!(top.bids.len(), 1);
        assert_eq!(top.asks.len(), 1);
        assert_eq!(top.best_bid().unwrap().price.inner(), dec!(1300));
    }
}
