use crate::enums::{Action, OrderSide, StrategyId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

/// One entry of the declarative target portfolio: a symbol, the fraction of
/// total assets it should occupy, and the rule family that trades it.
///
/// Loaded fresh from the per-market targets file once per run-cycle and
/// treated as immutable for the duration of that cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub symbol: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub target_weight: Decimal,
    #[serde(flatten)]
    pub strategy: StrategySpec,
    /// Venue code for overseas symbols (e.g. "NAS", "NYS"). Domestic symbols
    /// leave this unset.
    #[serde(default)]
    pub exchange: Option<String>,
}

/// The typed per-strategy parameter record, tagged by strategy identifier.
///
/// Validated once at load time instead of being poked defensively out of an
/// untyped map at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "params")]
pub enum StrategySpec {
    #[serde(rename = "MACD_RSI")]
    MacdRsi(MacdRsiParams),
    #[serde(rename = "MACD_RSI_TREND")]
    MacdRsiTrend(MacdRsiParams),
    #[serde(rename = "VOLATILITY_BREAKOUT")]
    VolatilityBreakout(BreakoutParams),
    #[serde(rename = "SMART_MOMENTUM")]
    SmartMomentum(MomentumParams),
}

impl StrategySpec {
    pub fn id(&self) -> StrategyId {
        match self {
            StrategySpec::MacdRsi(_) => StrategyId::MacdRsi,
            StrategySpec::MacdRsiTrend(_) => StrategyId::MacdRsiTrend,
            StrategySpec::VolatilityBreakout(_) => StrategyId::VolatilityBreakout,
            StrategySpec::SmartMomentum(_) => StrategyId::SmartMomentum,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdRsiParams {
    pub rsi_buy: Decimal,
    pub rsi_sell: Decimal,
}

impl Default for MacdRsiParams {
    fn default() -> Self {
        Self {
            rsi_buy: dec!(30),
            rsi_sell: dec!(70),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutParams {
    /// Fraction of the previous day's range added to today's open to form the
    /// breakout target price.
    pub k: Decimal,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        Self { k: dec!(0.6) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    /// Fallback K when the 20-day noise average is not yet available.
    pub k: Decimal,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self { k: dec!(0.5) }
    }
}

/// A position as reported by the broker's balance query.
///
/// Overwritten wholesale every cycle; the broker's answer is ground truth and
/// no local snapshot is trusted across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub display_name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl_pct: Decimal,
}

/// Account-level profit figures taken straight from the broker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitSummary {
    /// Profit locked in by sells today.
    pub realized: Decimal,
    /// Mark-to-market profit of everything still held.
    pub unrealized: Decimal,
    /// Change in total assets versus the previous close.
    pub day_change: Decimal,
}

/// The broker's authoritative answer to "what do I own and what can I spend".
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    pub total_asset: Decimal,
    pub cash: Decimal,
    pub positions: Vec<Position>,
    pub summary: ProfitSummary,
}

impl BalanceSnapshot {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

/// An order handed to the broker client for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    /// Reference price for limit-style submission. `None` means market order.
    pub price_hint: Option<Decimal>,
    pub exchange: Option<String>,
}

/// An order the broker has accepted but not yet confirmed filled or cancelled.
///
/// Owned exclusively by the order tracker; removal from the tracker is the
/// one and only release of `locked_amount`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    /// Notional reserved from investable cash while a buy is in flight.
    /// Zero for sells.
    pub locked_amount: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub exchange: Option<String>,
}

/// The output of a strategy evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub action: Action,
    pub reason: String,
}

impl Signal {
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            reason: String::new(),
        }
    }

    pub fn buy(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Buy,
            reason: reason.into(),
        }
    }

    pub fn sell(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Sell,
            reason: reason.into(),
        }
    }
}
