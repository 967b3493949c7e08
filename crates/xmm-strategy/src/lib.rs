//! Cross-exchange maker strategy.
//!
//! Quotes a layered two-sided book on the maker venue off the source
//! venue's live depth, and hedges filled inventory with market orders on
//! the source venue. The two loops share position state through the trade
//! collector; the circuit breaker, margin gate, and heartbeats gate them.

pub mod bollinger;
pub mod config;
pub mod error;
pub mod hedge;
pub mod quote;
pub mod recover;
pub mod strategy;

pub use bollinger::BollingerBand;
pub use config::{LayerScale, ProfitFixerConfig, StrategyConfig};
pub use error::{Result, StrategyError};
pub use hedge::{resolve_hedge, HedgeOrder, HedgeSkip};
pub use quote::{LayerPlan, Quote};
pub use strategy::CrossMaker;
