//! Risk error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("margin hedge not allowed: {0}")]
    MarginDenied(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;
