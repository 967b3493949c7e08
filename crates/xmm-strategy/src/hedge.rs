//! Hedge order sizing.
//!
//! Pure resolution of one hedging decision: which side offsets the
//! uncovered inventory, at what estimated price, and how much actually fits
//! the source balances, the margin quota, and the venue minimums.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use xmm_core::{Account, Market, OrderSide, Price, PriceVolume, Size};

/// Buy-side price pad so the sized order survives a small move.
const LAST_PRICE_MODIFIER: Decimal = dec!(1.001);

/// Safety gap over the venue minimums for the adjusted order.
const MIN_GAP: Decimal = dec!(1.02);

/// A sized hedge ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeOrder {
    pub side: OrderSide,
    pub quantity: Size,
    /// Price used for notional estimation; the order itself is a market
    /// order.
    pub price: Price,
}

/// Why no hedge order was produced this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum HedgeSkip {
    /// Nothing to offset.
    Zero,
    /// The raw notional does not clear the venue minimum.
    BelowMinNotional { notional: Decimal },
    /// After balance/quota adjustment the notional is too close to the
    /// minimum.
    AdjustedNotionalTooSmall { notional: Decimal },
    /// After adjustment the quantity is too close to the minimum.
    AdjustedQuantityTooSmall { quantity: Decimal },
}

/// Resolve the hedge for the current uncovered position.
///
/// `uncovered` is `position - covered`: positive means the strategy is net
/// long and must sell on the source venue. `margin_quota` caps the order
/// when the margin gate is active: base units for sells, quote units for
/// buys.
pub fn resolve_hedge(
    uncovered: Decimal,
    best_bid: Option<PriceVolume>,
    best_ask: Option<PriceVolume>,
    last_price: Price,
    account: &Account,
    market: &Market,
    margin_quota: Option<Decimal>,
) -> Result<HedgeOrder, HedgeSkip> {
    if uncovered.is_zero() {
        return Err(HedgeSkip::Zero);
    }

    let side = if uncovered > Decimal::ZERO {
        OrderSide::Sell
    } else {
        OrderSide::Buy
    };
    let mut quantity = Size::new(uncovered.abs());

    // Estimate against the side of the source book the market order will
    // take.
    let price = match side {
        OrderSide::Buy => best_ask.map(|pv| pv.price).unwrap_or(last_price),
        OrderSide::Sell => best_bid.map(|pv| pv.price).unwrap_or(last_price),
    };

    let notional = quantity.notional(price);
    if notional <= market.min_notional {
        return Err(HedgeSkip::BelowMinNotional { notional });
    }

    // Fit the available balance.
    match side {
        OrderSide::Buy => {
            let quote_available = account.available(&market.quote_currency);
            if quote_available < notional {
                let padded_price = price.inner() * LAST_PRICE_MODIFIER;
                quantity = quantity.min(Size::new(quote_available / padded_price));
            }
        }
        OrderSide::Sell => {
            quantity = quantity.min(Size::new(account.available(&market.base_currency)));
        }
    }

    // Fit the borrowable quota when margin-gated.
    if let Some(quota) = margin_quota {
        match side {
            OrderSide::Buy => {
                if price.is_positive() {
                    quantity = quantity.min(Size::new(quota / price.inner()));
                }
            }
            OrderSide::Sell => {
                quantity = quantity.min(Size::new(quota));
            }
        }
    }

    let quantity = market.truncate_quantity(quantity);

    let adjusted_notional = quantity.notional(price);
    if adjusted_notional <= market.min_notional * MIN_GAP {
        return Err(HedgeSkip::AdjustedNotionalTooSmall {
            notional: adjusted_notional,
        });
    }
    if quantity.inner() <= market.min_quantity.inner() * MIN_GAP {
        return Err(HedgeSkip::AdjustedQuantityTooSmall {
            quantity: quantity.inner(),
        });
    }

    Ok(HedgeOrder {
        side,
        quantity,
        price,
    })
}
