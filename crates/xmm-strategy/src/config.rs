//! Strategy configuration.
//!
//! Every recognized option is an explicit typed field with its default.
//! `apply_defaults` fills the derived defaults that depend on other fields
//! (shared margin, circuit breaker); `validate` rejects configurations the
//! strategy cannot start with.

use crate::error::{Result, StrategyError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use xmm_core::Size;
use xmm_risk::CircuitBreakerConfig;

fn default_update_interval_ms() -> u64 {
    1_000
}

fn default_hedge_interval_ms() -> u64 {
    10_000
}

fn default_order_cancel_wait_ms() -> u64 {
    20_000
}

fn default_recover_trade_scan_period_ms() -> u64 {
    30 * 60 * 1_000
}

fn default_num_layers() -> usize {
    1
}

fn default_min_margin_level() -> Decimal {
    dec!(1.7)
}

/// Per-layer quantity override, 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerScale {
    pub by_layer: Vec<Decimal>,
}

impl LayerScale {
    /// Quantity for a 1-based layer index.
    pub fn scale(&self, layer: usize) -> Result<Decimal> {
        self.by_layer
            .get(layer.saturating_sub(1))
            .copied()
            .ok_or_else(|| {
                StrategyError::Config(format!(
                    "quantityScale defines {} layers, layer {} requested",
                    self.by_layer.len(),
                    layer
                ))
            })
    }
}

/// Profit-fixer replay horizon for restart reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitFixerConfig {
    pub trades_since: DateTime<Utc>,
}

/// Strategy options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    /// Trading pair. Required.
    pub symbol: String,

    /// Source (hedge) session key. Required.
    pub source_exchange: String,

    /// Maker session key. Required.
    pub maker_exchange: String,

    /// Quoting tick period in milliseconds.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Hedging tick period in milliseconds.
    #[serde(default = "default_hedge_interval_ms")]
    pub hedge_interval_ms: u64,

    /// Bound on the shutdown cancel of maker orders, in milliseconds.
    #[serde(default = "default_order_cancel_wait_ms")]
    pub order_cancel_wait_time_ms: u64,

    /// Shared price offset; used for both sides when the per-side margins
    /// are unset.
    #[serde(default)]
    pub margin: Decimal,

    /// Bid price offset (defaults to `margin`, then 0.003).
    #[serde(default)]
    pub bid_margin: Decimal,

    /// Ask price offset (defaults to `margin`, then 0.003).
    #[serde(default)]
    pub ask_margin: Decimal,

    /// Price layers off the depth VWAP instead of the touch.
    #[serde(default)]
    pub use_depth_price: bool,

    /// Fixed depth for the VWAP reference; when zero, the cumulative layer
    /// quantity is used.
    #[serde(default)]
    pub depth_quantity: Size,

    /// Bollinger-band regime adjustment.
    #[serde(default)]
    pub enable_boll_band_margin: bool,

    /// Kline interval feeding the band (venue notation).
    #[serde(default)]
    pub boll_band_interval: String,

    /// Extra margin applied in a band breakout.
    #[serde(default)]
    pub boll_band_margin: Decimal,

    /// Multiplier on the band adjustment.
    #[serde(default)]
    pub boll_band_margin_factor: Decimal,

    /// Reserve floor of quote balance kept on the source venue.
    #[serde(default)]
    pub stop_hedge_quote_balance: Decimal,

    /// Reserve floor of base balance kept on the source venue.
    #[serde(default)]
    pub stop_hedge_base_balance: Decimal,

    /// Fixed quantity of the first layer.
    #[serde(default)]
    pub quantity: Size,

    /// Multiplies the previous layer's quantity.
    #[serde(default)]
    pub quantity_multiplier: Decimal,

    /// Explicit per-layer quantities; overrides `quantity`.
    #[serde(default)]
    pub quantity_scale: Option<LayerScale>,

    /// Hard cap on unhedged net inventory, in base currency.
    #[serde(default)]
    pub max_exposure_position: Decimal,

    #[serde(default)]
    pub disable_hedge: bool,

    #[serde(default)]
    pub notify_trade: bool,

    /// Replay missing trades via the venues' history endpoints.
    #[serde(default)]
    pub recover_trade: bool,

    #[serde(default = "default_recover_trade_scan_period_ms")]
    pub recover_trade_scan_period_ms: u64,

    #[serde(default = "default_num_layers")]
    pub num_layers: usize,

    /// Price steps (in units of tick size) between adjacent layers.
    #[serde(default)]
    pub pips: Decimal,

    /// Minimum source margin level for borrowed hedges.
    #[serde(default = "default_min_margin_level")]
    pub min_margin_level: Decimal,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub profit_fixer: Option<ProfitFixerConfig>,
}

impl StrategyConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn hedge_interval(&self) -> Duration {
        Duration::from_millis(self.hedge_interval_ms)
    }

    pub fn order_cancel_wait_time(&self) -> Duration {
        Duration::from_millis(self.order_cancel_wait_time_ms)
    }

    pub fn recover_trade_scan_period(&self) -> Duration {
        Duration::from_millis(self.recover_trade_scan_period_ms)
    }

    /// Fill derived defaults, mirroring the values the strategy has always
    /// shipped with.
    pub fn apply_defaults(&mut self) {
        let default_margin = dec!(0.003);

        if self.bid_margin.is_zero() {
            self.bid_margin = if self.margin.is_zero() {
                default_margin
            } else {
                self.margin
            };
        }
        if self.ask_margin.is_zero() {
            self.ask_margin = if self.margin.is_zero() {
                default_margin
            } else {
                self.margin
            };
        }

        if self.boll_band_interval.is_empty() {
            self.boll_band_interval = "1m".to_string();
        }
        if self.boll_band_margin.is_zero() {
            self.boll_band_margin = dec!(0.001);
        }
        if self.boll_band_margin_factor.is_zero() {
            self.boll_band_margin_factor = Decimal::ONE;
        }

        if self.num_layers == 0 {
            self.num_layers = 1;
        }
        if self.update_interval_ms == 0 {
            self.update_interval_ms = default_update_interval_ms();
        }
        if self.hedge_interval_ms == 0 {
            self.hedge_interval_ms = default_hedge_interval_ms();
        }
        if self.recover_trade_scan_period_ms == 0 {
            self.recover_trade_scan_period_ms = default_recover_trade_scan_period_ms();
        }
        if self.min_margin_level.is_zero() {
            self.min_margin_level = default_min_margin_level();
        }
    }

    /// Reject configurations the strategy cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(StrategyError::Config("symbol is required".to_string()));
        }
        if self.source_exchange.is_empty() || self.maker_exchange.is_empty() {
            return Err(StrategyError::Config(
                "sourceExchange and makerExchange are required".to_string(),
            ));
        }
        if self.quantity.is_zero() && self.quantity_scale.is_none() {
            return Err(StrategyError::Config(
                "quantity or quantityScale can not be empty".to_string(),
            ));
        }
        if self.quantity_multiplier.is_sign_negative() {
            return Err(StrategyError::Config(
                "quantityMultiplier can not be a negative number".to_string(),
            ));
        }
        if let Some(fixer) = &self.profit_fixer {
            if fixer.trades_since.timestamp() == 0 {
                return Err(StrategyError::Config(
                    "profitFixer.tradesSince can not be zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> StrategyConfig {
        toml::from_str(
            r#"
            symbol = "BTCUSDT"
            sourceExchange = "binance"
            makerExchange = "max"
            quantity = "0.01"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let mut config = minimal();
        config.apply_defaults();

        assert_eq!(config.update_interval(), Duration::from_secs(1));
        assert_eq!(config.hedge_interval(), Duration::from_secs(10));
        assert_eq!(config.num_layers, 1);
        assert_eq!(config.bid_margin, dec!(0.003));
        assert_eq!(config.ask_margin, dec!(0.003));
        assert_eq!(config.boll_band_interval, "1m");
        assert_eq!(config.min_margin_level, dec!(1.7));
        assert_eq!(
            config.recover_trade_scan_period(),
            Duration::from_secs(30 * 60)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shared_margin_fills_both_sides() {
        let mut config = minimal();
        config.margin = dec!(0.005);
        config.apply_defaults();

        assert_eq!(config.bid_margin, dec!(0.005));
        assert_eq!(config.ask_margin, dec!(0.005));
    }

    #[test]
    fn test_quantity_required() {
        let mut config = minimal();
        config.quantity = Size::ZERO;
        assert!(config.validate().is_err());

        config.quantity_scale = Some(LayerScale {
            by_layer: vec![dec!(0.01), dec!(0.02)],
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let mut config = minimal();
        config.quantity_multiplier = dec!(-2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layer_scale_bounds() {
        let scale = LayerScale {
            by_layer: vec![dec!(1), dec!(2)],
        };
        assert_eq!(scale.scale(1).unwrap(), dec!(1));
        assert_eq!(scale.scale(2).unwrap(), dec!(2));
        assert!(scale.scale(3).is_err());
    }
}
