//! Risk controls for the market-making engine.
//!
//! - `quota`: two-sided balance reservation used during one quoting pass
//! - `margin`: the margin hedge gate (borrowable quota vs. margin level)
//! - `circuit_breaker`: rolling-P&L halt policy

pub mod circuit_breaker;
pub mod error;
pub mod margin;
pub mod quota;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, HaltReason};
pub use error::{Result, RiskError};
pub use margin::MarginHedgeGate;
pub use quota::{Quota, QuotaTransaction};
