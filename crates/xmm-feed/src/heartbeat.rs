//! Best-price staleness detection.
//!
//! A book whose touch price stops moving for longer than the timeout is more
//! likely a stalled feed than a quiet market; the quoting loop must not price
//! off it.

use crate::error::{FeedError, Result};
use std::time::{Duration, Instant};
use xmm_core::PriceVolume;

/// Default staleness timeout for best-price updates.
pub const PRICE_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Staleness detector for one side's best price.
#[derive(Debug)]
pub struct PriceHeartbeat {
    side: &'static str,
    timeout: Duration,
    last: Option<PriceVolume>,
    last_change: Instant,
}

impl PriceHeartbeat {
    pub fn new(side: &'static str, timeout: Duration) -> Self {
        Self {
            side,
            timeout,
            last: None,
            last_change: Instant::now(),
        }
    }

    /// Feed the current best price.
    ///
    /// Returns `Ok(true)` when the price (or its volume) changed,
    /// `Ok(false)` when unchanged but still within the timeout, and a
    /// `StalePrice` error once the price has sat unchanged past the timeout.
    pub fn update(&mut self, price: PriceVolume, now: Instant) -> Result<bool> {
        match self.last {
            Some(last) if last == price => {
                let elapsed = now.duration_since(self.last_change);
                if elapsed > self.timeout {
                    return Err(FeedError::StalePrice {
                        side: self.side,
                        price: price.price.to_string(),
                        elapsed_ms: elapsed.as_millis(),
                        timeout_ms: self.timeout.as_millis(),
                    });
                }
                Ok(false)
            }
            _ => {
                self.last = Some(price);
                self.last_change = now;
                Ok(true)
            }
        }
    }

    pub fn last_change(&self) -> Instant {
        self.last_change
    }
}
