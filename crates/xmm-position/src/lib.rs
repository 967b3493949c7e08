//! Position accounting and trade collection.
//!
//! The trade collector is the single writer of the position: it joins order
//! events with trade events from both venues, folds executions into the
//! position, attributes realized profit, and reports each fill as one
//! batched event to handlers registered at subscription time.

pub mod collector;
pub mod error;
pub mod fixer;
pub mod position;
pub mod profit;

pub use collector::{FillEvent, TradeCollector};
pub use error::{PositionError, Result};
pub use fixer::ProfitFixer;
pub use position::{Position, Realized};
pub use profit::{Profit, ProfitStats};
