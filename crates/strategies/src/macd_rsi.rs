use core_types::{MacdRsiParams, Signal};
use rust_decimal::prelude::*;

use crate::Strategy;
use crate::error::StrategyError;
use crate::indicators::IndicatorRow;

/// MACD crossover entries with an RSI sanity gate.
///
/// Buys on a golden cross as long as RSI is not already overheated; exits on
/// the dead cross or when RSI runs past the configured ceiling.
pub struct MacdRsi {
    rsi_sell: f64,
}

impl MacdRsi {
    pub fn new(params: &MacdRsiParams) -> Result<Self, StrategyError> {
        let rsi_sell = params.rsi_sell.to_f64().ok_or_else(|| {
            StrategyError::InvalidParameters("rsi_sell is not representable as f64".to_string())
        })?;
        Ok(Self { rsi_sell })
    }
}

impl Strategy for MacdRsi {
    fn evaluate(
        &self,
        today: &IndicatorRow,
        yesterday: &IndicatorRow,
    ) -> Result<Signal, StrategyError> {
        let golden_cross =
            yesterday.macd < yesterday.macd_signal && today.macd > today.macd_signal;
        let dead_cross = yesterday.macd > yesterday.macd_signal && today.macd < today.macd_signal;

        // A missing RSI blocks the buy gate and never trips the overheat exit.
        if golden_cross && today.rsi.is_some_and(|r| r < self.rsi_sell) {
            return Ok(Signal::buy("MACD golden cross"));
        }

        if let Some(rsi) = today.rsi
            && rsi > self.rsi_sell
        {
            return Ok(Signal::sell(format!("RSI overheated ({rsi:.0})")));
        }
        if dead_cross {
            return Ok(Signal::sell("MACD dead cross"));
        }

        Ok(Signal::hold())
    }
}
