use chrono::NaiveDate;
use core_types::{BalanceSnapshot, Market, Target};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// The persisted starting-capital record cumulative profit is measured from.
#[derive(Debug, Serialize, Deserialize)]
struct BaselineRecord {
    initial_asset: Decimal,
    last_update: String,
}

/// File-backed baseline for "how much has the bot made since it started".
///
/// Initialized with the first total-asset figure it ever sees; only the
/// `last_update` stamp changes after that.
pub struct ProfitBaseline {
    path: PathBuf,
}

impl ProfitBaseline {
    pub fn new(data_dir: &Path, market: Market) -> Self {
        Self {
            path: data_dir.join(format!("profit_{}.json", market.tag())),
        }
    }

    /// Cumulative profit and its percentage against the recorded baseline.
    pub fn cumulative(
        &self,
        total_asset: Decimal,
        today: NaiveDate,
    ) -> Result<(Decimal, Decimal), EngineError> {
        let mut record = match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str::<BaselineRecord>(&raw)?,
            Err(_) => BaselineRecord {
                initial_asset: total_asset,
                last_update: String::new(),
            },
        };

        let profit = total_asset - record.initial_asset;
        let rate = if record.initial_asset > Decimal::ZERO {
            (profit / record.initial_asset * dec!(100)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        record.last_update = today.format("%Y-%m-%d").to_string();
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;

        Ok((profit, rate))
    }
}

fn pct(weight: Decimal) -> Decimal {
    (weight * dec!(100)).round_dp(1)
}

/// The pre-open report: what today's book is supposed to look like.
pub fn targets_report(market: Market, targets: &[Target]) -> String {
    let stock_weight: Decimal = targets.iter().map(|t| t.target_weight).sum();
    let cash_weight = (Decimal::ONE - stock_weight).max(Decimal::ZERO);

    let mut msg = format!("☀️ [{} | today's target portfolio]\n", market.tag());
    msg.push_str(&format!("🎯 equity weight: {}%\n", pct(stock_weight)));
    msg.push_str(&format!("💵 cash weight: {}% (implied)\n\n", pct(cash_weight)));

    for t in targets {
        let icon = if t.target_weight > Decimal::ZERO { "🔹" } else { "💤" };
        msg.push_str(&format!("{icon} {} ({})\n", t.display_name, t.symbol));
        msg.push_str(&format!(
            "   └ weight: {}% | strategy: {}\n",
            pct(t.target_weight),
            t.strategy.id().label()
        ));
    }
    msg
}

/// The post-close settlement report.
pub fn closing_report(
    market: Market,
    balance: &BalanceSnapshot,
    cumulative_profit: Decimal,
    cumulative_rate: Decimal,
) -> String {
    let s = &balance.summary;
    let mut msg = format!("🌙 [{} | closing report]\n", market.tag());
    msg.push_str(&format!("💰 total assets: {}\n", balance.total_asset.round_dp(0)));
    msg.push_str(&format!("💵 cash: {}\n", balance.cash.round_dp(0)));
    msg.push_str(&format!("📌 realized today: {:+}\n", s.realized.round_dp(0)));
    msg.push_str(&format!("📈 unrealized: {:+}\n", s.unrealized.round_dp(0)));
    msg.push_str(&format!("🔀 day change: {:+}\n", s.day_change.round_dp(0)));
    msg.push_str(&format!(
        "🔥 cumulative: {:+} ({:+}%)\n",
        cumulative_profit.round_dp(0),
        cumulative_rate
    ));

    msg.push_str("\n[holdings]\n");
    if balance.positions.is_empty() {
        msg.push_str("none\n");
    } else {
        let mut positions: Vec<_> = balance.positions.iter().collect();
        positions.sort_by(|a, b| b.market_value.cmp(&a.market_value));
        for p in positions {
            let ratio = if balance.total_asset > Decimal::ZERO {
                pct(p.market_value / balance.total_asset)
            } else {
                Decimal::ZERO
            };
            msg.push_str(&format!(
                "• {} x{} ({}%) {:+}%\n",
                p.display_name, p.quantity, ratio, p.unrealized_pnl_pct
            ));
        }
    }
    msg
}

/// The periodic intraday status report: actual weights against targets.
pub fn status_report(market: Market, balance: &BalanceSnapshot, targets: &[Target]) -> String {
    let stock_weight: Decimal = targets.iter().map(|t| t.target_weight).sum();
    let cash_weight = (Decimal::ONE - stock_weight).max(Decimal::ZERO);

    let mut msg = format!("📊 [{} | portfolio status]\n", market.tag());
    msg.push_str(&format!(
        "assets: {} | cash: {}\n",
        balance.total_asset.round_dp(0),
        balance.cash.round_dp(0)
    ));
    msg.push_str(&format!(
        "target equity: {}% | target cash: {}%\n",
        pct(stock_weight),
        pct(cash_weight)
    ));

    if balance.positions.is_empty() {
        msg.push_str("no holdings\n");
        return msg;
    }

    let mut positions: Vec<_> = balance.positions.iter().collect();
    positions.sort_by(|a, b| b.market_value.cmp(&a.market_value));
    for p in positions {
        let actual = if balance.total_asset > Decimal::ZERO {
            pct(p.market_value / balance.total_asset)
        } else {
            Decimal::ZERO
        };
        let target = targets
            .iter()
            .find(|t| t.symbol == p.symbol)
            .map(|t| pct(t.target_weight))
            .unwrap_or(Decimal::ZERO);
        msg.push_str(&format!(
            "• {} {:+}% | {}% (target {}%)\n",
            p.display_name, p.unrealized_pnl_pct, actual, target
        ));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{MacdRsiParams, Position, StrategySpec};

    fn target(symbol: &str, weight: Decimal) -> Target {
        Target {
            symbol: symbol.into(),
            display_name: format!("{symbol} Corp"),
            target_weight: weight,
            strategy: StrategySpec::MacdRsi(MacdRsiParams::default()),
            exchange: None,
        }
    }

    #[test]
    fn baseline_initializes_once_and_measures_from_it() {
        let dir = std::env::temp_dir().join(format!("baseline-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let baseline = ProfitBaseline::new(&dir, Market::Domestic);
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let (profit, rate) = baseline.cumulative(dec!(1000000), today).unwrap();
        assert_eq!(profit, Decimal::ZERO);
        assert_eq!(rate, Decimal::ZERO);

        // The bot made 5%: measured against the original baseline.
        let (profit, rate) = baseline.cumulative(dec!(1050000), today).unwrap();
        assert_eq!(profit, dec!(50000));
        assert_eq!(rate, dec!(5.00));
    }

    #[test]
    fn targets_report_shows_implied_cash() {
        let targets = vec![target("AAA", dec!(0.4)), target("BBB", dec!(0.35))];
        let msg = targets_report(Market::Domestic, &targets);
        assert!(msg.contains("equity weight: 75.0%"));
        assert!(msg.contains("cash weight: 25.0%"));
        assert!(msg.contains("AAA Corp"));
        assert!(msg.contains("MACD_RSI"));
    }

    #[test]
    fn status_report_pairs_actual_with_target_weights() {
        let balance = BalanceSnapshot {
            total_asset: dec!(1000000),
            cash: dec!(600000),
            positions: vec![Position {
                symbol: "AAA".into(),
                display_name: "AAA Corp".into(),
                quantity: 4,
                average_cost: dec!(90000),
                current_price: dec!(100000),
                market_value: dec!(400000),
                unrealized_pnl_pct: dec!(11.1),
            }],
            summary: Default::default(),
        };
        let msg = status_report(Market::Domestic, &balance, &[target("AAA", dec!(0.5))]);
        assert!(msg.contains("40.0% (target 50.0%)"));
    }
}
