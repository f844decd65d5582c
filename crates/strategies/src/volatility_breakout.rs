use core_types::{BreakoutParams, Signal};
use rust_decimal::prelude::*;

use crate::Strategy;
use crate::error::StrategyError;
use crate::indicators::IndicatorRow;

/// Classic volatility breakout: buy when the price clears today's open plus
/// a fraction of yesterday's range, cut the position if it falls back under
/// the open.
pub struct VolatilityBreakout {
    k: f64,
}

impl VolatilityBreakout {
    pub fn new(params: &BreakoutParams) -> Result<Self, StrategyError> {
        let k = params.k.to_f64().ok_or_else(|| {
            StrategyError::InvalidParameters("k is not representable as f64".to_string())
        })?;
        Ok(Self { k })
    }
}

impl Strategy for VolatilityBreakout {
    fn evaluate(
        &self,
        today: &IndicatorRow,
        _yesterday: &IndicatorRow,
    ) -> Result<Signal, StrategyError> {
        // No previous-day range on the very first bar of a series.
        let Some(range) = today.range else {
            return Ok(Signal::hold());
        };

        let target_price = today.open + range * self.k;

        if today.close > target_price {
            return Ok(Signal::buy("breakout above target"));
        }
        if today.close < today.open {
            return Ok(Signal::sell("fell back under the open"));
        }

        Ok(Signal::hold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_rows::row;
    use core_types::Action;

    fn strat() -> VolatilityBreakout {
        VolatilityBreakout::new(&BreakoutParams::default()).unwrap()
    }

    #[test]
    fn clearing_the_target_buys() {
        // target = 100 + 10 * 0.6 = 106
        let today = row(|r| {
            r.open = 100.0;
            r.range = Some(10.0);
            r.close = 106.5;
        });
        let signal = strat().evaluate(&today, &row(|_| {})).unwrap();
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn sitting_between_open_and_target_holds() {
        let today = row(|r| {
            r.open = 100.0;
            r.range = Some(10.0);
            r.close = 103.0;
        });
        let signal = strat().evaluate(&today, &row(|_| {})).unwrap();
        assert_eq!(signal.action, Action::Hold);
    }

    #[test]
    fn dropping_under_the_open_sells() {
        let today = row(|r| {
            r.open = 100.0;
            r.range = Some(10.0);
            r.close = 99.0;
        });
        let signal = strat().evaluate(&today, &row(|_| {})).unwrap();
        assert_eq!(signal.action, Action::Sell);
    }

    #[test]
    fn missing_range_holds() {
        let today = row(|r| {
            r.range = None;
            r.close = 150.0;
        });
        let signal = strat().evaluate(&today, &row(|_| {})).unwrap();
        assert_eq!(signal.action, Action::Hold);
    }
}
