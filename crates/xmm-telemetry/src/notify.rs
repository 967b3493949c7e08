//! Human-readable notifications.
//!
//! The engine reports halts, shutdowns, hedge submissions, and recoveries as
//! plain strings through this seam; deployments route them to chat or
//! paging, tests capture them, and the default sinks to the log.

use std::sync::Arc;
use tracing::info;

/// Notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Default notifier: writes notifications to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "notify", "{message}");
    }
}

/// Shared notifier handle.
pub type NotifierRef = Arc<dyn Notifier>;
