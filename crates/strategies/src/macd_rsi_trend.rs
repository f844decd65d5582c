use core_types::{MacdRsiParams, Signal};
use rust_decimal::prelude::*;

use crate::Strategy;
use crate::error::StrategyError;
use crate::indicators::IndicatorRow;

/// The MACD/RSI rules with a 60-day moving-average trend filter, meant for
/// large caps that respect their long average.
///
/// Entries require the price to sit above the 60-day line; a close below it
/// is an unconditional exit. Until 60 bars of history exist the strategy
/// holds.
pub struct MacdRsiTrend {
    rsi_sell: f64,
}

impl MacdRsiTrend {
    pub fn new(params: &MacdRsiParams) -> Result<Self, StrategyError> {
        let rsi_sell = params.rsi_sell.to_f64().ok_or_else(|| {
            StrategyError::InvalidParameters("rsi_sell is not representable as f64".to_string())
        })?;
        Ok(Self { rsi_sell })
    }
}

impl Strategy for MacdRsiTrend {
    fn evaluate(
        &self,
        today: &IndicatorRow,
        yesterday: &IndicatorRow,
    ) -> Result<Signal, StrategyError> {
        let Some(sma60) = today.sma60 else {
            return Ok(Signal::hold());
        };

        let golden_cross =
            yesterday.macd < yesterday.macd_signal && today.macd > today.macd_signal;
        let dead_cross = yesterday.macd > yesterday.macd_signal && today.macd < today.macd_signal;
        let uptrend = today.close > sma60;

        if golden_cross && today.rsi.is_some_and(|r| r < self.rsi_sell) && uptrend {
            return Ok(Signal::buy("MACD golden cross in uptrend"));
        }

        if let Some(rsi) = today.rsi
            && rsi > self.rsi_sell
        {
            return Ok(Signal::sell(format!("RSI overheated ({rsi:.0})")));
        }
        if dead_cross {
            return Ok(Signal::sell("MACD dead cross"));
        }
        if today.close < sma60 {
            return Ok(Signal::sell("trend broken below SMA60"));
        }

        Ok(Signal::hold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_rows::row;
    use core_types::Action;

    fn strat() -> MacdRsiTrend {
        MacdRsiTrend::new(&MacdRsiParams::default()).unwrap()
    }

    #[test]
    fn holds_without_sixty_days_of_history() {
        let yesterday = row(|r| {
            r.macd = -1.0;
            r.macd_signal = 0.0;
        });
        let today = row(|r| {
            r.macd = 1.0;
            r.macd_signal = 0.0;
            r.sma60 = None;
        });
        let signal = strat().evaluate(&today, &yesterday).unwrap();
        assert_eq!(signal.action, Action::Hold);
    }

    #[test]
    fn golden_cross_below_the_trend_line_does_not_buy() {
        let yesterday = row(|r| {
            r.macd = -1.0;
            r.macd_signal = 0.0;
        });
        let today = row(|r| {
            r.macd = 1.0;
            r.macd_signal = 0.0;
            r.close = 100.0;
            r.sma60 = Some(110.0);
        });
        let signal = strat().evaluate(&today, &yesterday).unwrap();
        // Below the line the trend-break exit fires instead.
        assert_eq!(signal.action, Action::Sell);
        assert!(signal.reason.contains("SMA60"));
    }

    #[test]
    fn golden_cross_in_uptrend_buys() {
        let yesterday = row(|r| {
            r.macd = -1.0;
            r.macd_signal = 0.0;
        });
        let today = row(|r| {
            r.macd = 1.0;
            r.macd_signal = 0.0;
            r.close = 120.0;
            r.sma60 = Some(110.0);
        });
        let signal = strat().evaluate(&today, &yesterday).unwrap();
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn close_below_trend_line_sells() {
        let yesterday = row(|r| r.sma60 = Some(110.0));
        let today = row(|r| {
            r.close = 105.0;
            r.sma60 = Some(110.0);
        });
        let signal = strat().evaluate(&today, &yesterday).unwrap();
        assert_eq!(signal.action, Action::Sell);
    }
}
