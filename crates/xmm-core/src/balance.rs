//! Account balance façade types.
//!
//! Balances are a read-only view the session adapter keeps current from
//! account-update events; the engine only ever snapshots them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-currency balance on one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub available: Decimal,
    pub locked: Decimal,
    /// Borrowed amount on margin sessions; zero elsewhere.
    pub borrowed: Decimal,
    /// Net asset as reported by the venue, when it reports one.
    pub net_asset: Decimal,
}

impl Balance {
    pub fn new(currency: impl Into<String>, available: Decimal) -> Self {
        Self {
            currency: currency.into(),
            available,
            ..Default::default()
        }
    }

    /// Net value of this balance: the venue-reported net asset, or
    /// `available + locked - borrowed` when the venue does not report one.
    pub fn net(&self) -> Decimal {
        if self.net_asset.is_zero() {
            self.available + self.locked - self.borrowed
        } else {
            self.net_asset
        }
    }

    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }
}

/// Account snapshot for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub balances: HashMap<String, Balance>,
    pub margin_enabled: bool,
    /// Venue-reported margin level; `None` on spot sessions.
    pub margin_level: Option<Decimal>,
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
}

impl Account {
    pub fn balance(&self, currency: &str) -> Option<&Balance> {
        self.balances.get(currency)
    }

    pub fn set_balance(&mut self, balance: Balance) {
        self.balances.insert(balance.currency.clone(), balance);
    }

    /// Available amount of a currency, zero when the currency is unknown.
    pub fn available(&self, currency: &str) -> Decimal {
        self.balances
            .get(currency)
            .map(|b| b.available)
            .unwrap_or_default()
    }
}
