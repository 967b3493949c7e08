//! Feed error types.

use thiserror::Error;

/// Errors from market-data state.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A best price has not changed within the staleness timeout.
    #[error("{side} price {price} stale for {elapsed_ms}ms (timeout {timeout_ms}ms)")]
    StalePrice {
        side: &'static str,
        price: String,
        elapsed_ms: u128,
        timeout_ms: u128,
    },

    /// The copied book failed validation (crossed or empty).
    #[error("invalid order book: {0}")]
    InvalidBook(String),

    /// No price known for a currency pair.
    #[error("no price for {0}")]
    MissingPrice(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;
