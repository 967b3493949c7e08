//! Observability and pacing utilities.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod rate_limit;

pub use error::{Result, TelemetryError};
pub use logging::init_logging;
pub use notify::{LogNotifier, Notifier, NotifierRef};
pub use rate_limit::{Reservation, TokenBucket};
