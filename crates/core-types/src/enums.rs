use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Which of the two brokerage venues a component is operating against.
///
/// The two markets trade in non-overlapping local-time sessions and each
/// carries its own credentials, target list, and session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Domestic,
    Overseas,
}

impl Market {
    /// Short tag used in log lines and persisted file names.
    pub fn tag(&self) -> &'static str {
        match self {
            Market::Domestic => "domestic",
            Market::Overseas => "overseas",
        }
    }
}

/// What a strategy wants done with a symbol this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Identifies which rule family evaluates a target's bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyId {
    MacdRsi,
    MacdRsiTrend,
    VolatilityBreakout,
    SmartMomentum,
}

impl StrategyId {
    /// The identifier as it appears in target files and reports.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyId::MacdRsi => "MACD_RSI",
            StrategyId::MacdRsiTrend => "MACD_RSI_TREND",
            StrategyId::VolatilityBreakout => "VOLATILITY_BREAKOUT",
            StrategyId::SmartMomentum => "SMART_MOMENTUM",
        }
    }
}

/// How much of a held position a sell signal liquidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellPolicy {
    /// Liquidate the entire position (the default).
    Full,
    /// Liquidate half, rounded up.
    Half,
}

impl Default for SellPolicy {
    fn default() -> Self {
        SellPolicy::Full
    }
}
