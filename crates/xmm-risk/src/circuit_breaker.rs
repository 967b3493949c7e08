//! Rolling-P&L circuit breaker.
//!
//! Records per-trade profits and reports a halt while the loss over the
//! rolling window exceeds the configured threshold, or while the trailing
//! consecutive-loss streak is too long. Halt state is recomputed on every
//! query: when the window slides past the triggering trades, quoting
//! resumes on its own.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Cumulative loss (positive number, in quote currency) over the window
    /// that halts quoting.
    pub maximum_loss: Decimal,

    /// Rolling window length.
    #[serde(with = "humantime_secs")]
    pub window: Duration,

    /// Consecutive losing trades that halt quoting.
    pub maximum_consecutive_losses: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            maximum_loss: Decimal::from(100),
            window: Duration::from_secs(3600),
            maximum_consecutive_losses: 8,
        }
    }
}

/// Duration as integer seconds in config files.
mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Why quoting is halted.
#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    WindowedLoss { loss: Decimal, threshold: Decimal },
    LossStreak { count: u32, threshold: u32 },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowedLoss { loss, threshold } => {
                write!(f, "windowed loss {loss} exceeds {threshold}")
            }
            Self::LossStreak { count, threshold } => {
                write!(f, "{count} consecutive losses (limit {threshold})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProfitRecord {
    profit: Decimal,
    at: DateTime<Utc>,
}

/// Rolling-window circuit breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    records: Mutex<VecDeque<ProfitRecord>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Record one trade's realized profit.
    pub fn record_profit(&self, profit: Decimal, at: DateTime<Utc>) {
        self.records.lock().push_back(ProfitRecord { profit, at });
    }

    /// Current halt state, recomputed against `now`.
    pub fn is_halted(&self, now: DateTime<Utc>) -> Option<HaltReason> {
        let mut records = self.records.lock();

        let window = ChronoDuration::from_std(self.config.window)
            .unwrap_or_else(|_| ChronoDuration::seconds(3600));
        let cutoff = now - window;
        while records.front().is_some_and(|r| r.at < cutoff) {
            records.pop_front();
        }

        let total: Decimal = records.iter().map(|r| r.profit).sum();
        if -total > self.config.maximum_loss {
            return Some(HaltReason::WindowedLoss {
                loss: -total,
                threshold: self.config.maximum_loss,
            });
        }

        let streak = records
            .iter()
            .rev()
            .take_while(|r| r.profit.is_sign_negative() && !r.profit.is_zero())
            .count() as u32;
        if streak > self.config.maximum_consecutive_losses {
            return Some(HaltReason::LossStreak {
                count: streak,
                threshold: self.config.maximum_consecutive_losses,
            });
        }

        None
    }
}
