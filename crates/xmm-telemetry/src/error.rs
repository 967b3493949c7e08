//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("logging init error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
