//! Position error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("trade history query failed: {0}")]
    History(#[from] xmm_session::SessionError),

    #[error("profit fixer requires a non-zero trades-since checkpoint")]
    MissingCheckpoint,
}

pub type Result<T> = std::result::Result<T, PositionError>;
