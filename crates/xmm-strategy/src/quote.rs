//! Maker quote computation: layer prices, quantities, and quota-guarded
//! assembly of one quoting pass.

use crate::config::StrategyConfig;
use crate::error::Result;
use rust_decimal::Decimal;
use xmm_core::{
    MarginSideEffect, Market, OrderBookSnapshot, OrderSide, OrderType, Price, Size, SubmitOrder,
    TimeInForce,
};
use xmm_feed::aggregate_price;
use xmm_risk::QuotaTransaction;

/// Ephemeral per-pass quoting parameters.
#[derive(Debug, Clone)]
pub struct Quote {
    pub best_bid_price: Price,
    pub best_ask_price: Price,
    pub bid_margin: Decimal,
    pub ask_margin: Decimal,
    pub bid_layer_pips: Decimal,
    pub ask_layer_pips: Decimal,
}

/// Price of one layer.
///
/// The reference is either the touch price or, with depth pricing, the VWAP
/// over the source side for `depth_quantity` (falling back to the cumulative
/// layer quantity when no fixed depth is configured). The margin pushes the
/// price away from the reference; layers beyond the first step out by
/// `layer × pips × tick_size`.
#[allow(clippy::too_many_arguments)]
pub fn layer_price(
    book: &OrderBookSnapshot,
    side: OrderSide,
    quote: &Quote,
    layer: usize,
    use_depth_price: bool,
    depth_quantity: Size,
    accumulated_quantity: Size,
    tick_size: Price,
) -> Price {
    let layer_index = Decimal::from(layer as u64);

    let reference = if use_depth_price {
        let required = if depth_quantity.is_positive() {
            depth_quantity
        } else {
            accumulated_quantity
        };
        aggregate_price(book.side(side), required)
    } else {
        match side {
            OrderSide::Buy => quote.best_bid_price,
            OrderSide::Sell => quote.best_ask_price,
        }
    };

    match side {
        OrderSide::Buy => {
            let mut price = reference * (Decimal::ONE - quote.bid_margin);
            if layer > 0 {
                price = price - tick_size * (quote.bid_layer_pips * layer_index);
            }
            price
        }
        OrderSide::Sell => {
            let mut price = reference * (Decimal::ONE + quote.ask_margin);
            if layer > 0 {
                price = price + tick_size * (quote.ask_layer_pips * layer_index);
            }
            price
        }
    }
}

/// Result of one layer-generation pass.
#[derive(Debug, Default)]
pub struct LayerPlan {
    pub orders: Vec<SubmitOrder>,
    /// Quote-currency exposure of the generated bid layers.
    pub bid_exposure: Decimal,
    /// Quote-currency exposure of the generated ask layers.
    pub ask_exposure: Decimal,
    /// Layer-0 prices actually generated, for metrics.
    pub top_bid_price: Option<Price>,
    pub top_ask_price: Option<Price>,
    /// Layers dropped by truncation or failed quota locks.
    pub skipped_layers: usize,
}

/// Generate the maker orders of one quoting pass.
///
/// Every bid layer reserves quote on the maker ledger and base on the hedge
/// ledger (a filled bid will be hedged by selling base on the source);
/// every ask layer mirrors this. A failed lock pair rolls back and skips
/// only that layer.
pub fn build_layers(
    config: &StrategyConfig,
    maker_market: &Market,
    book: &OrderBookSnapshot,
    quote: &Quote,
    disable_bid: bool,
    disable_ask: bool,
    group_id: u32,
    maker_quota: &mut QuotaTransaction,
    hedge_quota: &mut QuotaTransaction,
) -> Result<LayerPlan> {
    let mut plan = LayerPlan::default();

    let mut bid_quantity = config.quantity;
    let mut ask_quantity = config.quantity;
    let mut accumulated_bid = Size::ZERO;
    let mut accumulated_ask = Size::ZERO;

    for layer in 0..config.num_layers {
        if !disable_bid {
            if let Some(scale) = &config.quantity_scale {
                bid_quantity = Size::new(scale.scale(layer + 1)?);
            }
            accumulated_bid += bid_quantity;

            let raw = layer_price(
                book,
                OrderSide::Buy,
                quote,
                layer,
                config.use_depth_price,
                config.depth_quantity,
                accumulated_bid,
                maker_market.tick_size,
            );
            let price = maker_market.truncate_price(raw);
            let quantity = maker_market.truncate_quantity(bid_quantity);

            if quantity.is_zero() {
                plan.skipped_layers += 1;
            } else if maker_quota.quote.lock(quantity.notional(price))
                && hedge_quota.base.lock(quantity.inner())
            {
                plan.orders.push(SubmitOrder {
                    symbol: config.symbol.clone(),
                    side: OrderSide::Buy,
                    order_type: OrderType::Limit,
                    price,
                    stop_price: None,
                    quantity,
                    time_in_force: TimeInForce::GoodTilCancelled,
                    margin_side_effect: MarginSideEffect::None,
                    group_id,
                });
                maker_quota.commit();
                hedge_quota.commit();
                plan.bid_exposure += quantity.notional(price);
                plan.top_bid_price.get_or_insert(price);
            } else {
                maker_quota.rollback();
                hedge_quota.rollback();
                plan.skipped_layers += 1;
            }

            if config.quantity_multiplier > Decimal::ZERO {
                bid_quantity = bid_quantity * config.quantity_multiplier;
            }
        }

        if !disable_ask {
            if let Some(scale) = &config.quantity_scale {
                ask_quantity = Size::new(scale.scale(layer + 1)?);
            }
            accumulated_ask += ask_quantity;

            let raw = layer_price(
                book,
                OrderSide::Sell,
                quote,
                layer,
                config.use_depth_price,
                config.depth_quantity,
                accumulated_ask,
                maker_market.tick_size,
            );
            let price = maker_market.truncate_price(raw);
            let quantity = maker_market.truncate_quantity(ask_quantity);

            if quantity.is_zero() {
                plan.skipped_layers += 1;
            } else if maker_quota.base.lock(quantity.inner())
                && hedge_quota.quote.lock(quantity.notional(price))
            {
                plan.orders.push(SubmitOrder {
                    symbol: config.symbol.clone(),
                    side: OrderSide::Sell,
                    order_type: OrderType::Limit,
                    price,
                    stop_price: None,
                    quantity,
                    time_in_force: TimeInForce::GoodTilCancelled,
                    margin_side_effect: MarginSideEffect::None,
                    group_id,
                });
                maker_quota.commit();
                hedge_quota.commit();
                plan.ask_exposure += quantity.notional(price);
                plan.top_ask_price.get_or_insert(price);
            } else {
                maker_quota.rollback();
                hedge_quota.rollback();
                plan.skipped_layers += 1;
            }

            if config.quantity_multiplier > Decimal::ZERO {
                ask_quantity = ask_quantity * config.quantity_multiplier;
            }
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use xmm_core::PriceVolume;

    fn pv(price: Decimal, volume: Decimal) -> PriceVolume {
        PriceVolume::new(Price::new(price), Size::new(volume))
    }

    fn source_book() -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: "BTCUSDT".to_string(),
            bids: vec![
                pv(dec!(1300), dec!(1)),
                pv(dec!(1200), dec!(2)),
                pv(dec!(1100), dec!(3)),
            ],
            asks: vec![
                pv(dec!(1301), dec!(1)),
                pv(dec!(1400), dec!(2)),
                pv(dec!(1500), dec!(3)),
            ],
            sequence: None,
        }
    }

    fn quote() -> Quote {
        Quote {
            best_bid_price: Price::new(dec!(1300)),
            best_ask_price: Price::new(dec!(1301)),
            bid_margin: dec!(0.001),
            ask_margin: dec!(0.001),
            bid_layer_pips: dec!(100),
            ask_layer_pips: dec!(100),
        }
    }

    fn tick() -> Price {
        Price::new(dec!(0.01))
    }

    #[test]
    fn test_depth_priced_bid_layer_0() {
        // (1300*1 + 1200*2) / 3 * (1 - 0.001) ≈ 1232.10
        let price = layer_price(
            &source_book(),
            OrderSide::Buy,
            &quote(),
            0,
            true,
            Size::new(dec!(3)),
            Size::ZERO,
            tick(),
        );
        assert_eq!(price.inner().round_dp(2), dec!(1232.10));
    }

    #[test]
    fn test_depth_priced_bid_layer_1() {
        // layer 0 reference minus 1 * 100 pips * 0.01 tick
        let price = layer_price(
            &source_book(),
            OrderSide::Buy,
            &quote(),
            1,
            true,
            Size::new(dec!(3)),
            Size::ZERO,
            tick(),
        );
        assert_eq!(price.inner().round_dp(2), dec!(1231.10));
    }

    #[test]
    fn test_depth_priced_ask_layers() {
        // (1301*1 + 1400*2) / 3 * (1 + 0.001) ≈ 1368.367
        let layer0 = layer_price(
            &source_book(),
            OrderSide::Sell,
            &quote(),
            0,
            true,
            Size::new(dec!(3)),
            Size::ZERO,
            tick(),
        );
        assert_eq!(layer0.inner().round_dp(3), dec!(1368.367));

        let layer1 = layer_price(
            &source_book(),
            OrderSide::Sell,
            &quote(),
            1,
            true,
            Size::new(dec!(3)),
            Size::ZERO,
            tick(),
        );
        assert_eq!(layer1.inner().round_dp(3), dec!(1369.367));
    }

    #[test]
    fn test_touch_priced_layers_without_depth() {
        let price = layer_price(
            &source_book(),
            OrderSide::Buy,
            &quote(),
            0,
            false,
            Size::ZERO,
            Size::ZERO,
            tick(),
        );
        assert_eq!(price.inner(), dec!(1300) * dec!(0.999));
    }

    fn test_config(num_layers: usize) -> StrategyConfig {
        let mut config: StrategyConfig = toml::from_str(
            r#"
            symbol = "BTCUSDT"
            sourceExchange = "binance"
            makerExchange = "max"
            quantity = "0.1"
            "#,
        )
        .unwrap();
        config.num_layers = num_layers;
        config.pips = dec!(100);
        config.apply_defaults();
        config
    }

    fn maker_market() -> Market {
        Market {
            symbol: "BTCUSDT".to_string(),
            base_currency: "BTC".to_string(),
            quote_currency: "USDT".to_string(),
            tick_size: Price::new(dec!(0.01)),
            step_size: Size::new(dec!(0.001)),
            min_quantity: Size::new(dec!(0.001)),
            min_notional: dec!(10),
            price_precision: 2,
            quantity_precision: 3,
        }
    }

    fn quotas(maker_base: Decimal, maker_quote: Decimal) -> (QuotaTransaction, QuotaTransaction) {
        let mut maker = QuotaTransaction::new();
        maker.base.add(maker_base);
        maker.quote.add(maker_quote);
        let mut hedge = QuotaTransaction::new();
        hedge.base.add(dec!(1000));
        hedge.quote.add(dec!(10000000));
        (maker, hedge)
    }

    #[test]
    fn test_layer_spacing() {
        let config = test_config(3);
        let (mut maker, mut hedge) = quotas(dec!(10), dec!(100000));

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &quote(),
            false,
            false,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();

        let bids: Vec<Decimal> = plan
            .orders
            .iter()
            .filter(|o| o.side == OrderSide::Buy)
            .map(|o| o.price.inner())
            .collect();
        let asks: Vec<Decimal> = plan
            .orders
            .iter()
            .filter(|o| o.side == OrderSide::Sell)
            .map(|o| o.price.inner())
            .collect();
        assert_eq!(bids.len(), 3);
        assert_eq!(asks.len(), 3);

        // Adjacent layers are at least pips * tick apart.
        let min_gap = dec!(100) * dec!(0.01);
        for pair in bids.windows(2) {
            assert!(pair[0] - pair[1] >= min_gap, "bid gap {:?}", pair);
        }
        for pair in asks.windows(2) {
            assert!(pair[1] - pair[0] >= min_gap, "ask gap {:?}", pair);
        }
    }

    #[test]
    fn test_quota_exhaustion_skips_layer_not_pass() {
        let config = test_config(3);
        // Quote quota covers roughly one bid layer (0.1 * ~1298.7 ≈ 130).
        let (mut maker, mut hedge) = quotas(dec!(10), dec!(140));

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &quote(),
            false,
            false,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();

        let bids = plan.orders.iter().filter(|o| o.side == OrderSide::Buy).count();
        let asks = plan.orders.iter().filter(|o| o.side == OrderSide::Sell).count();
        assert_eq!(bids, 1, "only the first bid layer fits the quota");
        assert_eq!(asks, 3, "ask layers are unaffected by the bid quota");
        assert_eq!(plan.skipped_layers, 2);
    }

    #[test]
    fn test_disabled_sides_generate_nothing() {
        let config = test_config(2);
        let (mut maker, mut hedge) = quotas(dec!(10), dec!(100000));

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &quote(),
            true,
            true,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();
        assert!(plan.orders.is_empty());
    }

    #[test]
    fn test_quantity_multiplier_grows_layers() {
        let mut config = test_config(3);
        config.quantity_multiplier = dec!(2);
        let (mut maker, mut hedge) = quotas(dec!(100), dec!(10000000));

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &quote(),
            false,
            true,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();

        let quantities: Vec<Decimal> = plan.orders.iter().map(|o| o.quantity.inner()).collect();
        assert_eq!(quantities, vec![dec!(0.1), dec!(0.2), dec!(0.4)]);
    }

    #[test]
    fn test_quantity_scale_overrides_fixed_quantity() {
        let mut config = test_config(2);
        config.quantity_scale = Some(crate::config::LayerScale {
            by_layer: vec![dec!(0.5), dec!(0.25)],
        });
        let (mut maker, mut hedge) = quotas(dec!(100), dec!(10000000));

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &quote(),
            false,
            true,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();

        let quantities: Vec<Decimal> = plan.orders.iter().map(|o| o.quantity.inner()).collect();
        assert_eq!(quantities, vec![dec!(0.5), dec!(0.25)]);
    }

    #[test]
    fn test_zero_after_truncation_is_skipped_silently() {
        let mut config = test_config(1);
        config.quantity = Size::new(dec!(0.0004)); // below the 0.001 step
        let (mut maker, mut hedge) = quotas(dec!(100), dec!(10000000));

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &quote(),
            false,
            false,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();

        assert!(plan.orders.is_empty());
        assert_eq!(plan.skipped_layers, 2);
    }

    #[test]
    fn test_prices_snap_to_tick() {
        let config = test_config(1);
        let (mut maker, mut hedge) = quotas(dec!(100), dec!(10000000));

        let mut wide_quote = quote();
        wide_quote.bid_margin = dec!(0.00133); // produces an off-grid raw price

        let plan = build_layers(
            &config,
            &maker_market(),
            &source_book(),
            &wide_quote,
            false,
            true,
            7,
            &mut maker,
            &mut hedge,
        )
        .unwrap();

        // Raw price 1300 * 0.99867 = 1298.271 truncates down to the grid.
        let price = plan.orders[0].price.inner();
        assert_eq!(price, dec!(1298.27));
        assert_eq!(price * dec!(100) % dec!(1), Decimal::ZERO);
    }
}
