//! Strategy error types.

use thiserror::Error;

/// Errors from strategy construction and the worker loops.
///
/// Only the `Config`/`MissingMarket` kinds abort startup; everything else
/// surfaces as a skipped tick inside the loops.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("market {symbol} is not defined on session {session}")]
    MissingMarket { session: String, symbol: String },

    #[error(transparent)]
    Session(#[from] xmm_session::SessionError),

    #[error(transparent)]
    Position(#[from] xmm_position::PositionError),
}

pub type Result<T> = std::result::Result<T, StrategyError>;
