use chrono::NaiveDate;
use core_types::{Position, ProfitSummary};
use rust_decimal::Decimal;
use serde::Deserialize;

/// The envelope every brokerage response arrives in. `rt_cd` of "0" means
/// success; anything else carries a message code and a human-readable reason.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "rt_cd")]
    pub return_code: String,
    #[serde(rename = "msg_cd", default)]
    pub message_code: String,
    #[serde(rename = "msg1", default)]
    pub message: String,
    #[serde(flatten)]
    pub body: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceBody {
    pub holdings: Vec<HoldingRow>,
    pub summary: AccountSummaryRow,
}

#[derive(Debug, Deserialize)]
pub struct HoldingRow {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    #[serde(default)]
    pub pnl_pct: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AccountSummaryRow {
    pub total_asset: Decimal,
    pub cash: Decimal,
    #[serde(default)]
    pub realized_profit: Decimal,
    #[serde(default)]
    pub unrealized_profit: Decimal,
    #[serde(default)]
    pub day_change: Decimal,
}

impl BalanceBody {
    /// Converts the wire rows into the engine's snapshot. Zero-quantity rows
    /// (fully sold today, still reported) are dropped.
    pub fn into_snapshot(self) -> core_types::BalanceSnapshot {
        let positions = self
            .holdings
            .into_iter()
            .filter(|h| h.quantity > 0)
            .map(|h| Position {
                symbol: h.symbol,
                display_name: h.name,
                quantity: h.quantity,
                average_cost: h.average_cost,
                current_price: h.current_price,
                market_value: h.market_value,
                unrealized_pnl_pct: h.pnl_pct,
            })
            .collect();

        core_types::BalanceSnapshot {
            total_asset: self.summary.total_asset,
            cash: self.summary.cash,
            positions,
            summary: ProfitSummary {
                realized: self.summary.realized_profit,
                unrealized: self.summary.unrealized_profit,
                day_change: self.summary.day_change,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BarsBody {
    pub bars: Vec<BarRow>,
}

/// One daily bar as the broker sends it; dates arrive as "YYYYMMDD".
#[derive(Debug, Deserialize)]
pub struct BarRow {
    pub date: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: i64,
}

impl BarRow {
    pub fn into_bar(self) -> Option<core_types::Bar> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y%m%d").ok()?;
        Some(core_types::Bar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteBody {
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenOrdersBody {
    pub orders: Vec<OpenOrderRow>,
}

#[derive(Debug, Deserialize)]
pub struct OpenOrderRow {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EmptyBody {}
