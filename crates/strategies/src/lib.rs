//! The rule families that turn indicator rows into trade signals.
//!
//! This is a pure logic crate: it knows nothing about the broker, the cache,
//! or order execution. It consumes daily bars from `core-types`, derives an
//! indicator frame, and answers one question per symbol per cycle: buy, sell,
//! or hold.
//!
//! Strategies are stateless. All history lives in the `IndicatorFrame`, which
//! is rebuilt from the bar cache every cycle, so a strategy evaluation only
//! ever sees today's row and yesterday's.

pub mod error;
pub mod factory;
pub mod indicators;
pub mod macd_rsi;
pub mod macd_rsi_trend;
pub mod smart_momentum;
pub mod volatility_breakout;

pub use error::StrategyError;
pub use factory::create_strategy;
pub use indicators::{IndicatorFrame, IndicatorRow, MIN_BARS};
pub use macd_rsi::MacdRsi;
pub use macd_rsi_trend::MacdRsiTrend;
pub use smart_momentum::SmartMomentum;
pub use volatility_breakout::VolatilityBreakout;

use core_types::Signal;

/// The common interface every rule family implements.
///
/// `today` is the most recent indicator row (with the live quote already
/// overlaid upstream) and `yesterday` the row before it.
pub trait Strategy: Send + Sync {
    fn evaluate(
        &self,
        today: &IndicatorRow,
        yesterday: &IndicatorRow,
    ) -> Result<Signal, StrategyError>;
}
