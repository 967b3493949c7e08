//! Per-pass balance reservation.
//!
//! A `QuotaTransaction` is a scratch ledger over the balance snapshot taken
//! at the start of one quoting pass. It is a reservation mechanism, not a
//! truth source: locks are tentative until committed, and a rollback only
//! ever undoes the locks taken since the last commit.

use rust_decimal::Decimal;

/// One-sided reservation ledger.
#[derive(Debug, Default, Clone)]
pub struct Quota {
    available: Decimal,
    locked: Decimal,
    committed: Decimal,
}

impl Quota {
    /// Add funds to the reservable pool.
    pub fn add(&mut self, amount: Decimal) {
        self.available += amount;
    }

    /// Tentatively reserve `amount`.
    ///
    /// Succeeds only while the remaining available strictly exceeds the
    /// request; a failed lock leaves the ledger untouched and the caller
    /// must roll back its pair.
    pub fn lock(&mut self, amount: Decimal) -> bool {
        if amount < self.available {
            self.available -= amount;
            self.locked += amount;
            true
        } else {
            false
        }
    }

    /// Promote the outstanding locks; idempotent at the end of a layer.
    pub fn commit(&mut self) {
        self.committed += self.locked;
        self.locked = Decimal::ZERO;
    }

    /// Return the outstanding (uncommitted) locks to the pool.
    pub fn rollback(&mut self) {
        self.available += self.locked;
        self.locked = Decimal::ZERO;
    }

    pub fn available(&self) -> Decimal {
        self.available
    }

    pub fn committed(&self) -> Decimal {
        self.committed
    }
}

/// Two-sided (base, quote) reservation ledger for one quoting pass.
#[derive(Debug, Default, Clone)]
pub struct QuotaTransaction {
    pub base: Quota,
    pub quote: Quota,
}

impl QuotaTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote the current layer's locks on both sides.
    pub fn commit(&mut self) {
        self.base.commit();
        self.quote.commit();
    }

    /// Discard the current layer's locks on both sides.
    pub fn rollback(&mut self) {
        self.base.rollback();
        self.quote.rollback();
    }
}
