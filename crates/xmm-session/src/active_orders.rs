//! Active maker order bookkeeping.
//!
//! Tracks the resting orders of the current quoting layer. Mutated by the
//! quoting loop on submit and by user-data-stream tasks on terminal status.

use crate::error::Result;
use crate::session::TradingSession;
use dashmap::DashMap;
use std::time::Duration;
use tracing::{info, warn};
use xmm_core::{Order, OrderId};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(500);
const CANCEL_MAX_ROUNDS: usize = 10;

/// The set of currently-active maker orders for one symbol.
#[derive(Debug)]
pub struct ActiveOrderBook {
    symbol: String,
    orders: DashMap<OrderId, Order>,
}

impl ActiveOrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            orders: DashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn add(&self, order: Order) {
        if order.is_active() {
            self.orders.insert(order.id, order);
        }
    }

    pub fn remove(&self, id: OrderId) -> Option<Order> {
        self.orders.remove(&id).map(|(_, o)| o)
    }

    /// Apply a status transition; terminal orders leave the active set.
    pub fn update(&self, order: &Order) {
        if order.status.is_terminal() {
            self.orders.remove(&order.id);
        } else if let Some(mut existing) = self.orders.get_mut(&order.id) {
            existing.status = order.status;
            existing.executed_quantity = order.executed_quantity;
            existing.updated_at = order.updated_at;
        }
    }

    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|e| *e.key()).collect()
    }

    /// Cancel every active order and wait until the venue confirms the book
    /// is clear.
    ///
    /// Best-effort: the cancel request is idempotent, so each poll round
    /// re-issues it for whatever is still open. Gives up after a bounded
    /// number of rounds so a wedged venue cannot hang the quoting loop.
    pub async fn graceful_cancel(&self, session: &dyn TradingSession) -> Result<()> {
        if self.orders.is_empty() {
            return Ok(());
        }

        for round in 0..CANCEL_MAX_ROUNDS {
            let ids = self.ids();
            if ids.is_empty() {
                return Ok(());
            }

            if round > 0 {
                tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
            }

            if let Err(err) = session.cancel_orders(&self.symbol, ids.clone()).await {
                warn!(symbol = %self.symbol, %err, "cancel request failed, retrying");
                continue;
            }

            // Confirm against the venue; stream updates may lag the cancel.
            match session.query_open_orders(&self.symbol).await {
                Ok(open) => {
                    let still_open: Vec<OrderId> = open
                        .iter()
                        .filter(|o| self.orders.contains_key(&o.id))
                        .map(|o| o.id)
                        .collect();

                    for id in &ids {
                        if !still_open.contains(id) {
                            self.orders.remove(id);
                        }
                    }

                    if still_open.is_empty() {
                        return Ok(());
                    }

                    info!(
                        symbol = %self.symbol,
                        remaining = still_open.len(),
                        round,
                        "orders still open after cancel"
                    );
                }
                Err(err) => {
                    warn!(symbol = %self.symbol, %err, "open-order query failed after cancel");
                }
            }
        }

        Err(crate::SessionError::Exchange(format!(
            "{} orders still open after graceful cancel",
            self.num_orders()
        )))
    }
}
