use core_types::{MomentumParams, Signal};
use rust_decimal::prelude::*;

use crate::Strategy;
use crate::error::StrategyError;
use crate::indicators::IndicatorRow;

/// Momentum breakout with a noise-adaptive K.
///
/// The breakout fraction follows the 20-day noise average (clamped to a safe
/// band), so whippy symbols demand a bigger move before entry. Buys also need
/// the price above its 20-day line and volume holding up against yesterday.
/// Exits on extreme RSI or a close under the 20-day line with a 1% buffer.
pub struct SmartMomentum {
    fallback_k: f64,
}

const K_MIN: f64 = 0.3;
const K_MAX: f64 = 0.7;
const RSI_EXIT: f64 = 85.0;
const SMA20_BUFFER: f64 = 0.99;
const VOLUME_FLOOR: f64 = 0.8;

impl SmartMomentum {
    pub fn new(params: &MomentumParams) -> Result<Self, StrategyError> {
        let fallback_k = params.k.to_f64().ok_or_else(|| {
            StrategyError::InvalidParameters("k is not representable as f64".to_string())
        })?;
        Ok(Self { fallback_k })
    }
}

impl Strategy for SmartMomentum {
    fn evaluate(
        &self,
        today: &IndicatorRow,
        yesterday: &IndicatorRow,
    ) -> Result<Signal, StrategyError> {
        let (Some(sma20), Some(range)) = (today.sma20, today.range) else {
            return Ok(Signal::hold());
        };

        let k = today
            .noise_ma20
            .unwrap_or(self.fallback_k)
            .clamp(K_MIN, K_MAX);
        let target_price = today.open + range * k;

        let bull_market = today.close > sma20;
        let volume_ok = today.volume > yesterday.volume * VOLUME_FLOOR;

        if today.close > target_price && bull_market && volume_ok {
            return Ok(Signal::buy(format!("momentum breakout (k={k:.2})")));
        }

        // Treat a missing RSI as neutral rather than blocking the exit checks.
        let rsi = today.rsi.unwrap_or(50.0);
        if rsi > RSI_EXIT {
            return Ok(Signal::sell(format!("RSI extreme ({rsi:.0})")));
        }
        if today.close < sma20 * SMA20_BUFFER {
            return Ok(Signal::sell("trend broken below SMA20"));
        }

        Ok(Signal::hold())
    }
}
