use core_types::StrategySpec;

use crate::Strategy;
use crate::error::StrategyError;
use crate::macd_rsi::MacdRsi;
use crate::macd_rsi_trend::MacdRsiTrend;
use crate::smart_momentum::SmartMomentum;
use crate::volatility_breakout::VolatilityBreakout;

/// Creates a strategy instance from a target's typed spec.
///
/// Parameters are validated at construction so a bad targets file fails
/// loudly at the start of a cycle, not mid-evaluation.
pub fn create_strategy(spec: &StrategySpec) -> Result<Box<dyn Strategy>, StrategyError> {
    match spec {
        StrategySpec::MacdRsi(params) => Ok(Box::new(MacdRsi::new(params)?)),
        StrategySpec::MacdRsiTrend(params) => Ok(Box::new(MacdRsiTrend::new(params)?)),
        StrategySpec::VolatilityBreakout(params) => Ok(Box::new(VolatilityBreakout::new(params)?)),
        StrategySpec::SmartMomentum(params) => Ok(Box::new(SmartMomentum::new(params)?)),
    }
}
