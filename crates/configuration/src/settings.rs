use core_types::SellPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub domestic: MarketConfig,
    pub overseas: MarketConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Credentials and file paths for one brokerage venue.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Base URL of the broker's REST endpoint.
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub account_no: String,
    /// Paper-trading account when true; selects the broker's sandbox
    /// transaction codes.
    #[serde(default)]
    pub paper: bool,
    /// JSON file holding this market's target portfolio.
    pub targets_file: PathBuf,
}

/// Telegram delivery settings. Leaving either field empty disables alerting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
}

/// Knobs governing the execution engine itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Wall-clock seconds between bulk bar refreshes.
    pub refresh_interval_secs: u64,
    /// Age past which an unfilled order is cancelled.
    pub order_timeout_secs: i64,
    /// Fraction of total assets always withheld from the buy-side pool.
    pub min_cash_ratio: Decimal,
    /// A position above this multiple of its target amount is sold down.
    /// Deliberately wide so small price noise does not oscillate trades.
    pub drift_sell_multiple: Decimal,
    /// Held value plus pending-buy notional above this multiple of target
    /// cancels the pending buy.
    pub overbuy_cancel_multiple: Decimal,
    /// Target weights summing above this produce a warning.
    pub max_weight_sum: Decimal,
    /// How much of a position a sell signal liquidates.
    pub sell_policy: SellPolicy,
    /// Whether locked pending-buy notional counts toward a symbol's current
    /// value when sizing a buy.
    pub count_pending_in_position: bool,
    /// Pause between run-cycles while a market is active.
    pub cycle_pause_ms: u64,
    /// Reduced poll interval while a market's holiday breaker is tripped.
    pub holiday_poll_secs: u64,
    /// Seconds between periodic portfolio status reports.
    pub status_report_interval_secs: u64,
    /// Sleep applied after an unhandled cycle error before the loop resumes.
    pub error_cooldown_secs: u64,
    /// Directory for persisted state (tokens, trade log, profit baseline).
    pub data_dir: PathBuf,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 600,
            order_timeout_secs: 60,
            min_cash_ratio: dec!(0.01),
            drift_sell_multiple: dec!(1.2),
            overbuy_cancel_multiple: dec!(1.1),
            max_weight_sum: dec!(1.05),
            sell_policy: SellPolicy::Full,
            count_pending_in_position: true,
            cycle_pause_ms: 3000,
            holiday_poll_secs: 60,
            status_report_interval_secs: 10_800,
            error_cooldown_secs: 60,
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Exchange-local clock settings shared by both session windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Offset of the exchange-local wall clock from UTC, in hours.
    pub utc_offset_hours: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { utc_offset_hours: 9 }
    }
}
