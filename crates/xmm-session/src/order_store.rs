//! Order store indexed by venue and order id.
//!
//! Shared between the quoting loop (which registers created orders) and the
//! user-data stream tasks (which apply status transitions). Keys include the
//! venue: order ids are only unique per exchange, and the store sees both
//! sessions' orders. Lookups must be cheap because the trade collector
//! consults the store on every execution.

use dashmap::DashMap;
use tracing::warn;
use xmm_core::{ExchangeName, Order, OrderId};

type StoreKey = (ExchangeName, OrderId);

/// Concurrent order store for one symbol across both venues.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: DashMap<StoreKey, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, order: Order) {
        self.orders.insert((order.exchange.clone(), order.id), order);
    }

    pub fn exists(&self, exchange: &ExchangeName, id: OrderId) -> bool {
        self.orders.contains_key(&(exchange.clone(), id))
    }

    pub fn get(&self, exchange: &ExchangeName, id: OrderId) -> Option<Order> {
        self.orders.get(&(exchange.clone(), id)).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Merge a stream-reported order state into the store.
    ///
    /// Unknown orders are inserted as-is (the update may precede our own
    /// registration). Known orders go through the status machine; a rejected
    /// transition keeps the stored state and logs.
    pub fn update(&self, incoming: Order) {
        let key = (incoming.exchange.clone(), incoming.id);
        match self.orders.get_mut(&key) {
            Some(mut existing) => {
                if let Err(err) = existing.apply_update(
                    incoming.status,
                    incoming.executed_quantity,
                    incoming.updated_at,
                ) {
                    warn!(order_id = %incoming.id, %err, "dropping out-of-order order update");
                }
            }
            None => {
                self.orders.insert(key, incoming);
            }
        }
    }

    /// Remove terminal orders beyond `keep`, oldest first. The store would
    /// otherwise grow with one entry per order ever placed.
    pub fn prune_terminal(&self, keep: usize) {
        if self.orders.len() <= keep {
            return;
        }
        let mut terminal: Vec<(StoreKey, chrono::DateTime<chrono::Utc>)> = self
            .orders
            .iter()
            .filter(|e| !e.value().is_active())
            .map(|e| (e.key().clone(), e.value().updated_at))
            .collect();
        terminal.sort_by_key(|(_, at)| *at);

        let excess = self.orders.len().saturating_sub(keep);
        for (key, _) in terminal.into_iter().take(excess) {
            self.orders.remove(&key);
        }
    }
}
