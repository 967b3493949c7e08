//! Prometheus metrics for the market-making engine.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: a registration failure
//! means duplicate metric names, which should crash at startup rather than
//! fail silently. These panics only occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_gauge_vec, CounterVec, GaugeVec};

const STRATEGY_LABELS: &[&str] = &["exchange", "symbol"];

/// Layer-0 maker bid price of the latest quoting pass.
pub static MAKER_BEST_BID_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "xmm_maker_best_bid_price",
        "Best maker bid price of the latest quoting pass",
        STRATEGY_LABELS
    )
    .unwrap()
});

/// Layer-0 maker ask price of the latest quoting pass.
pub static MAKER_BEST_ASK_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "xmm_maker_best_ask_price",
        "Best maker ask price of the latest quoting pass",
        STRATEGY_LABELS
    )
    .unwrap()
});

/// Open bid exposure in quote currency after the latest pass.
pub static OPEN_ORDER_BID_EXPOSURE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "xmm_open_order_bid_exposure",
        "Open maker bid exposure in quote currency",
        STRATEGY_LABELS
    )
    .unwrap()
});

/// Open ask exposure in quote currency after the latest pass.
pub static OPEN_ORDER_ASK_EXPOSURE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "xmm_open_order_ask_exposure",
        "Open maker ask exposure in quote currency",
        STRATEGY_LABELS
    )
    .unwrap()
});

/// Configured number of quote layers.
pub static CONFIG_NUM_LAYERS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "xmm_config_num_layers",
        "Configured number of maker quote layers",
        STRATEGY_LABELS
    )
    .unwrap()
});

/// Configured maximum exposure position.
pub static CONFIG_MAX_EXPOSURE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "xmm_config_max_exposure",
        "Configured maximum exposure position in base currency",
        STRATEGY_LABELS
    )
    .unwrap()
});

/// Hedge orders submitted, by side.
pub static HEDGE_ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "xmm_hedge_orders_total",
        "Total hedge market orders submitted",
        &["exchange", "symbol", "side"]
    )
    .unwrap()
});

/// Quoting ticks skipped, by reason.
pub static QUOTE_TICKS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "xmm_quote_ticks_skipped_total",
        "Quoting ticks skipped, by reason",
        &["exchange", "symbol", "reason"]
    )
    .unwrap()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        // Touching every static twice must not panic with duplicate
        // registration.
        for _ in 0..2 {
            MAKER_BEST_BID_PRICE
                .with_label_values(&["maker", "BTCUSDT"])
                .set(98000.0);
            MAKER_BEST_ASK_PRICE
                .with_label_values(&["maker", "BTCUSDT"])
                .set(98010.0);
            OPEN_ORDER_BID_EXPOSURE
                .with_label_values(&["maker", "BTCUSDT"])
                .set(1.0);
            OPEN_ORDER_ASK_EXPOSURE
                .with_label_values(&["maker", "BTCUSDT"])
                .set(1.0);
            CONFIG_NUM_LAYERS
                .with_label_values(&["maker", "BTCUSDT"])
                .set(2.0);
            CONFIG_MAX_EXPOSURE
                .with_label_values(&["maker", "BTCUSDT"])
                .set(1.0);
            HEDGE_ORDERS_TOTAL
                .with_label_values(&["source", "BTCUSDT", "sell"])
                .inc();
            QUOTE_TICKS_SKIPPED_TOTAL
                .with_label_values(&["maker", "BTCUSDT", "halted"])
                .inc();
        }
    }
}
