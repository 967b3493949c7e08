//! Margin hedge gate.
//!
//! Decides whether a margin-borrowed hedge is allowed on a given side, and
//! how much can be borrowed for it. The exchange-reported margin level is
//! authoritative; the level computed from valued balances is only a
//! fallback for venues that do not report one. All balances are valued in
//! the quote currency through the price solver; a currency with no known
//! price contributes zero and is logged, never a panic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::warn;
use xmm_core::{Account, Market, OrderSide, Price};
use xmm_feed::SimplePriceSolver;

/// Cross-margin re-leverage multiple: borrowed funds post back as
/// collateral and can be borrowed against again, so each unit of
/// margin-level headroom unlocks a multiple of net equity before the level
/// reaches the floor. Calibrated against the hedge venue's cross-margin
/// account tier.
const HEADROOM_RELEVERAGE: Decimal = dec!(6.2);

/// Gate over one margin-enabled source session.
pub struct MarginHedgeGate {
    solver: Arc<SimplePriceSolver>,
    market: Market,
    /// Margin level below which buy-side borrowing stops (typical 1.7).
    min_margin_level: Decimal,
}

impl MarginHedgeGate {
    pub fn new(solver: Arc<SimplePriceSolver>, market: Market, min_margin_level: Decimal) -> Self {
        Self {
            solver,
            market,
            min_margin_level,
        }
    }

    /// Total borrowed value in quote currency.
    pub fn debt_value(&self, account: &Account) -> Decimal {
        self.sum_balances(account, |b| b.borrowed)
    }

    /// Total net (equity minus debt) value in quote currency.
    pub fn net_value(&self, account: &Account) -> Decimal {
        self.sum_balances(account, |b| b.net())
    }

    fn sum_balances(
        &self,
        account: &Account,
        value: impl Fn(&xmm_core::Balance) -> Decimal,
    ) -> Decimal {
        let quote = &self.market.quote_currency;
        account
            .balances
            .values()
            .map(|balance| {
                let amount = value(balance);
                if amount.is_zero() {
                    return Decimal::ZERO;
                }
                match self.solver.price_of(&balance.currency, quote) {
                    Some(price) => amount * price,
                    None => {
                        warn!(
                            currency = %balance.currency,
                            quote = %quote,
                            "no price for balance, valuing at zero"
                        );
                        Decimal::ZERO
                    }
                }
            })
            .sum()
    }

    /// Margin level computed from valued balances: total equity over debt,
    /// `None` (treated as infinite) when there is no debt.
    pub fn margin_level(&self, account: &Account) -> Option<Decimal> {
        let debt = self.debt_value(account);
        if debt.is_zero() {
            return None;
        }
        Some((self.net_value(account) + debt) / debt)
    }

    /// The margin level the gate decides on: the exchange-reported level
    /// when the venue provides one, else the computed fallback.
    pub fn effective_margin_level(&self, account: &Account) -> Option<Decimal> {
        account.margin_level.or_else(|| self.margin_level(account))
    }

    /// Whether a hedge on `side` may borrow, and the borrowable quota:
    /// quote units for buy hedges, base units for sell hedges.
    ///
    /// Below the minimum margin level only sell hedges are allowed (selling
    /// reduces debt), sized by the quote balance on hand converted at the
    /// last price. Above it, the borrow quota is the margin-level headroom
    /// re-levered over net equity.
    pub fn allow_margin_hedge(
        &self,
        account: &Account,
        side: OrderSide,
        last_price: Price,
    ) -> (bool, Decimal) {
        let debt = self.debt_value(account);
        let net = self.net_value(account);

        // An account with no debt and no reported level has no meaningful
        // margin level; grant it one unit of headroom.
        let headroom = match self.effective_margin_level(account) {
            Some(level) if level < self.min_margin_level => {
                return match side {
                    OrderSide::Buy => (false, Decimal::ZERO),
                    OrderSide::Sell => {
                        if last_price.is_zero() {
                            warn!("last price unavailable, sell-side hedge quota is zero");
                            return (true, Decimal::ZERO);
                        }
                        let quote_available = account.available(&self.market.quote_currency);
                        (true, quote_available / last_price.inner())
                    }
                };
            }
            Some(level) => level - self.min_margin_level,
            None => {
                debug_assert!(debt.is_zero());
                Decimal::ONE
            }
        };

        let borrow_quota = (net * headroom * HEADROOM_RELEVERAGE).max(Decimal::ZERO);

        match side {
            OrderSide::Buy => (true, borrow_quota),
            OrderSide::Sell => {
                if last_price.is_zero() {
                    warn!("last price unavailable, sell-side borrow quota is zero");
                    return (true, Decimal::ZERO);
                }
                (true, borrow_quota / last_price.inner())
            }
        }
    }
}
