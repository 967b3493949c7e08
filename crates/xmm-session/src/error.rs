//! Session error types.

use thiserror::Error;

/// Errors surfaced by venue adapters.
#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// Transient transport failure; retry on the next tick.
    #[error("network error: {0}")]
    Network(String),

    /// The venue throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The venue rejected the request outright.
    #[error("exchange error: {0}")]
    Exchange(String),

    /// The adapter does not know the referenced order.
    #[error("unknown order: {0}")]
    UnknownOrder(String),

    /// The session is missing a market or capability the engine requires.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl SessionError {
    /// Whether the caller may retry on a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
