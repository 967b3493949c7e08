//! Bollinger band over a rolling close-price window.
//!
//! Fed by closed klines of the configured interval. Band math runs in f64:
//! the band is a regime signal, not an accounting quantity, and the final
//! margins are re-expressed as decimals before touching any price.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use xmm_core::Price;

/// Default lookback window, in closed candles.
pub const DEFAULT_WINDOW: usize = 21;

/// Default band width in standard deviations.
pub const DEFAULT_WIDTH: f64 = 1.0;

/// Rolling Bollinger band.
#[derive(Debug)]
pub struct BollingerBand {
    window: usize,
    width: f64,
    closes: VecDeque<f64>,
}

impl BollingerBand {
    pub fn new(window: usize, width: f64) -> Self {
        Self {
            window: window.max(2),
            width,
            closes: VecDeque::with_capacity(window.max(2)),
        }
    }

    /// Feed one closed candle.
    pub fn update(&mut self, close: Price) {
        let value = close.inner().to_f64().unwrap_or(0.0);
        if value <= 0.0 {
            return;
        }
        self.closes.push_back(value);
        while self.closes.len() > self.window {
            self.closes.pop_front();
        }
    }

    /// Whether enough candles have been seen to produce a band.
    pub fn is_ready(&self) -> bool {
        self.closes.len() >= self.window
    }

    fn mean_and_stddev(&self) -> Option<(f64, f64)> {
        if !self.is_ready() {
            return None;
        }
        let n = self.closes.len() as f64;
        let mean = self.closes.iter().sum::<f64>() / n;
        let variance = self.closes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        Some((mean, variance.sqrt()))
    }

    /// Upper band: SMA + width × σ.
    pub fn up_band(&self) -> Option<Price> {
        let (mean, stddev) = self.mean_and_stddev()?;
        Decimal::from_f64_retain(mean + self.width * stddev).map(Price::new)
    }

    /// Lower band: SMA − width × σ.
    pub fn down_band(&self) -> Option<Price> {
        let (mean, stddev) = self.mean_and_stddev()?;
        Decimal::from_f64_retain(mean - self.width * stddev).map(Price::new)
    }
}

impl Default for BollingerBand {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_WIDTH)
    }
}
