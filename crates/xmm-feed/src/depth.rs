//! Volume-weighted depth pricing.

use rust_decimal::Decimal;
use xmm_core::{Price, PriceVolume, Size};

/// Volume-weighted average price to fill `required_quantity` at the top of
/// one book side.
///
/// The side must be ordered best-first (bids descending, asks ascending).
///
/// - Empty side: returns zero.
/// - First level already covers the quantity: that level's price, no
///   averaging.
/// - Otherwise walk levels, draining the remaining quantity; the final level
///   contributes only the residual.
///
/// When total depth is short of the requested quantity, the result is still
/// `accumulated / required_quantity` — the shortfall prices at zero, so the
/// value comes out clearly low and callers must treat it as insufficient
/// depth.
pub fn aggregate_price(levels: &[PriceVolume], required_quantity: Size) -> Price {
    if levels.is_empty() {
        return Price::ZERO;
    }

    if levels[0].volume >= required_quantity {
        return levels[0].price;
    }

    let mut remaining = required_quantity.inner();
    let mut accumulated = Decimal::ZERO;

    for level in levels {
        if level.volume.inner() >= remaining {
            accumulated += remaining * level.price.inner();
            remaining = Decimal::ZERO;
            break;
        }

        remaining -= level.volume.inner();
        accumulated += level.volume.inner() * level.price.inner();
    }

    Price::new(accumulated / required_quantity.inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use xmm_core::Size;

    fn pv(price: rust_decimal::Decimal, volume: rust_decimal::Decimal) -> PriceVolume {
        PriceVolume::new(Price::new(price), Size::new(volume))
    }

    fn bids() -> Vec<PriceVolume> {
        vec![
            pv(dec!(1000), dec!(1)),
            pv(dec!(1200), dec!(1)),
            pv(dec!(1400), dec!(1)),
        ]
    }

    #[test]
    fn test_empty_side_is_zero() {
        assert_eq!(aggregate_price(&[], Size::new(dec!(1))), Price::ZERO);
    }

    #[test]
    fn test_first_level_covers_quantity() {
        // Q = 0.5 fits in the first level: no averaging.
        assert_eq!(
            aggregate_price(&bids(), Size::new(dec!(0.5))).inner(),
            dec!(1000)
        );
        assert_eq!(
            aggregate_price(&bids(), Size::new(dec!(1))).inner(),
            dec!(1000)
        );
    }

    #[test]
    fn test_walks_levels() {
        // Q = 2: (1000*1 + 1200*1) / 2 = 1100
        assert_eq!(
            aggregate_price(&bids(), Size::new(dec!(2))).inner(),
            dec!(1100)
        );
    }

    #[test]
    fn test_partial_final_level() {
        // Q = 1.5: (1000*1 + 1200*0.5) / 1.5 = 1066.66..
        let price = aggregate_price(&bids(), Size::new(dec!(1.5)));
        assert_eq!(price.inner().round_dp(4), dec!(1066.6667));
    }

    #[test]
    fn test_shortfall_prices_at_zero() {
        // Q = 6 > total depth 3: (1000 + 1200 + 1400) / 6 = 600,
        // clearly below the touch.
        assert_eq!(
            aggregate_price(&bids(), Size::new(dec!(6))).inner(),
            dec!(600)
        );
    }

    #[test]
    fn test_vwap_monotonic_on_bids() {
        // Larger required quantity on a strictly decreasing bid side never
        // improves the price... it walks away from the touch.
        let side = bids();
        let mut last = aggregate_price(&side, Size::new(dec!(0.5)));
        for q in [dec!(1), dec!(1.5), dec!(2), dec!(2.5), dec!(3)] {
            let price = aggregate_price(&side, Size::new(q));
            assert!(price <= last, "vwap should not improve as quantity grows");
            last = price;
        }
    }

    #[test]
    fn test_vwap_monotonic_on_asks() {
        let side = vec![
            pv(dec!(1301), dec!(1)),
            pv(dec!(1400), dec!(2)),
            pv(dec!(1500), dec!(3)),
        ];
        let mut last = aggregate_price(&side, Size::new(dec!(0.5)));
        for q in [dec!(1), dec!(2), dec!(3), dec!(4.5), dec!(6)] {
            let price = aggregate_price(&side, Size::new(q));
            assert!(price >= last, "ask vwap should not improve as quantity grows");
            last = price;
        }
    }
}
