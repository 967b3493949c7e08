//! Periodic trade-recovery scanner.
//!
//! Replays recent trade history from both venues through the collector to
//! fill stream gaps. Each scan overlaps the previous window by five minutes
//! so clock skew between venue and host cannot open a hole.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use xmm_position::TradeCollector;
use xmm_session::TradingSession;

/// Overlap added to every scan window.
const SCAN_OVERLAP: Duration = Duration::from_secs(5 * 60);

/// Run the scanner until the stop signal.
pub async fn run_scanner(
    collector: Arc<TradeCollector>,
    sessions: Vec<Arc<dyn TradingSession>>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The immediate first tick would re-scan on every restart; skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.changed() => return,
            _ = ticker.tick() => {
                let window = period + SCAN_OVERLAP;
                let since = Utc::now()
                    - ChronoDuration::from_std(window)
                        .unwrap_or_else(|_| ChronoDuration::minutes(35));

                info!(window_secs = window.as_secs(), "scanning for missing trades");

                for session in &sessions {
                    let Some(history) = session.trade_history() else {
                        continue;
                    };
                    match collector.recover(history.as_ref(), since).await {
                        Ok(0) => {}
                        Ok(count) => {
                            info!(session = session.name(), count, "trade recovery found gaps");
                        }
                        Err(err) => {
                            warn!(session = session.name(), %err, "trade recovery scan failed");
                        }
                    }
                }
            }
        }
    }
}
