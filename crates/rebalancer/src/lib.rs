//! Pure position-sizing arithmetic.
//!
//! Everything here is a deterministic function from balances, targets, and
//! prices to trade quantities. No I/O, no clocks, no broker state; the engine
//! owns sequencing and this crate owns the math. All money stays `Decimal`.

use core_types::{BalanceSnapshot, OrderSide, SellPolicy, Target};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// The thresholds the sizing rules run against. Mirrors the trading section
/// of the config file; the engine builds one per market.
#[derive(Debug, Clone)]
pub struct RebalanceRules {
    /// Fraction of total assets always kept as cash.
    pub min_cash_ratio: Decimal,
    /// A position is trimmed only when it exceeds this multiple of its target.
    pub drift_sell_multiple: Decimal,
    /// A pending buy is cancelled when holdings plus the locked notional
    /// exceed this multiple of the target.
    pub overbuy_cancel_multiple: Decimal,
    /// Target weights summing past this trigger a warning, not a halt.
    pub max_weight_sum: Decimal,
    pub sell_policy: SellPolicy,
}

impl Default for RebalanceRules {
    fn default() -> Self {
        Self {
            min_cash_ratio: dec!(0.01),
            drift_sell_multiple: dec!(1.2),
            overbuy_cancel_multiple: dec!(1.1),
            max_weight_sum: dec!(1.05),
            sell_policy: SellPolicy::Full,
        }
    }
}

/// Why a planned trade exists; carried into the trade log and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    /// Full liquidation of a holding that is not in the target file.
    Cleanup,
    /// Trimming a position that drifted past its drift multiple.
    Drift,
    /// A strategy signal.
    Signal,
}

/// One trade the planner wants executed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    pub price: Decimal,
    pub kind: IntentKind,
    pub reason: String,
}

/// Cash available for new buys after the reserve and in-flight locks.
///
/// Never negative: a breached reserve means no buying, not forced selling.
pub fn investable_cash(
    cash: Decimal,
    total_asset: Decimal,
    min_cash_ratio: Decimal,
    locked_total: Decimal,
) -> Decimal {
    (cash - total_asset * min_cash_ratio - locked_total).max(Decimal::ZERO)
}

pub fn weight_sum(targets: &[Target]) -> Decimal {
    targets.iter().map(|t| t.target_weight).sum()
}

/// Holdings with no entry in the target file are liquidated in full.
pub fn plan_cleanup(balance: &BalanceSnapshot, targets: &[Target]) -> Vec<TradeIntent> {
    balance
        .positions
        .iter()
        .filter(|p| !targets.iter().any(|t| t.symbol == p.symbol))
        .map(|p| TradeIntent {
            symbol: p.symbol.clone(),
            side: OrderSide::Sell,
            quantity: p.quantity,
            price: p.current_price,
            kind: IntentKind::Cleanup,
            reason: "not in targets".to_string(),
        })
        .collect()
}

/// Shares to sell when a position has drifted past its multiple.
///
/// The comparison is strict: a position sitting exactly at the multiple is
/// left alone. The trim brings it back to the target amount, not to zero.
pub fn drift_sell_quantity(
    quantity_held: i64,
    price: Decimal,
    target_amount: Decimal,
    drift_sell_multiple: Decimal,
) -> Option<i64> {
    if quantity_held <= 0 || price <= Decimal::ZERO {
        return None;
    }
    let current_amount = Decimal::from(quantity_held) * price;
    if current_amount <= target_amount * drift_sell_multiple {
        return None;
    }
    let excess = current_amount - target_amount;
    let quantity = (excess / price).floor().to_i64()?;
    (quantity > 0).then_some(quantity)
}

/// Shares to buy toward the target amount, bounded by investable cash.
///
/// A gap smaller than one share's price is not worth an order; a budget
/// smaller than one share's price means the cash reserve wins.
pub fn buy_quantity(
    target_amount: Decimal,
    current_amount: Decimal,
    price: Decimal,
    investable: Decimal,
) -> Option<i64> {
    if price <= Decimal::ZERO {
        return None;
    }
    let needed = target_amount - current_amount;
    if needed < price || investable < price {
        return None;
    }
    let budget = needed.min(investable);
    let quantity = (budget / price).floor().to_i64()?;
    (quantity > 0).then_some(quantity)
}

/// Shares to sell on a strategy sell signal.
///
/// `Half` rounds up so a one-share position still makes progress.
pub fn signal_sell_quantity(quantity_held: i64, policy: SellPolicy) -> Option<i64> {
    if quantity_held <= 0 {
        return None;
    }
    let quantity = match policy {
        SellPolicy::Full => quantity_held,
        SellPolicy::Half => (quantity_held + 1) / 2,
    };
    Some(quantity)
}

/// Whether a pending buy should be cancelled because the position plus the
/// in-flight notional already exceeds the overbuy multiple of the target.
/// Strict comparison; sitting exactly at the multiple is fine.
pub fn is_overbought(
    position_value: Decimal,
    locked_buy_amount: Decimal,
    target_amount: Decimal,
    overbuy_cancel_multiple: Decimal,
) -> bool {
    position_value + locked_buy_amount > target_amount * overbuy_cancel_multiple
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{MacdRsiParams, Position, StrategySpec};

    fn target(symbol: &str, weight: Decimal) -> Target {
        Target {
            symbol: symbol.into(),
            display_name: symbol.into(),
            target_weight: weight,
            strategy: StrategySpec::MacdRsi(MacdRsiParams::default()),
            exchange: None,
        }
    }

    fn position(symbol: &str, quantity: i64, price: Decimal) -> Position {
        Position {
            symbol: symbol.into(),
            display_name: symbol.into(),
            quantity,
            average_cost: price,
            current_price: price,
            market_value: Decimal::from(quantity) * price,
            unrealized_pnl_pct: Decimal::ZERO,
        }
    }

    #[test]
    fn investable_cash_respects_reserve_and_locks() {
        // 1,000,000 assets, 1% reserve = 10,000 held back.
        let cash = investable_cash(dec!(50000), dec!(1000000), dec!(0.01), dec!(15000));
        assert_eq!(cash, dec!(25000));
    }

    #[test]
    fn investable_cash_never_goes_negative() {
        let cash = investable_cash(dec!(5000), dec!(1000000), dec!(0.01), dec!(0));
        assert_eq!(cash, Decimal::ZERO);
    }

    #[test]
    fn weight_sum_adds_all_targets() {
        let targets = vec![target("A", dec!(0.4)), target("B", dec!(0.35))];
        assert_eq!(weight_sum(&targets), dec!(0.75));
    }

    #[test]
    fn cleanup_only_touches_untracked_holdings() {
        let balance = BalanceSnapshot {
            total_asset: dec!(1000000),
            cash: dec!(100000),
            positions: vec![
                position("TRACKED", 10, dec!(50000)),
                position("ORPHAN", 3, dec!(20000)),
            ],
            summary: Default::default(),
        };
        let intents = plan_cleanup(&balance, &[target("TRACKED", dec!(0.5))]);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].symbol, "ORPHAN");
        assert_eq!(intents[0].quantity, 3);
        assert_eq!(intents[0].kind, IntentKind::Cleanup);
    }

    #[test]
    fn drift_at_exactly_the_multiple_does_not_sell() {
        // 12 shares at 10,000 = 120,000 = exactly 1.2x of 100,000.
        let q = drift_sell_quantity(12, dec!(10000), dec!(100000), dec!(1.2));
        assert_eq!(q, None);
    }

    #[test]
    fn drift_past_the_multiple_trims_back_to_target() {
        // 13 shares at 10,000 = 130,000 vs target 100,000: sell floor(30,000/10,000).
        let q = drift_sell_quantity(13, dec!(10000), dec!(100000), dec!(1.2));
        assert_eq!(q, Some(3));
    }

    #[test]
    fn drift_excess_smaller_than_one_share_is_kept() {
        // 121,000 vs target 100,000 at price 25,000: floor(21,000/25,000) = 0.
        let q = drift_sell_quantity(11, dec!(11000), dec!(100000), dec!(1.2));
        assert_eq!(q, None);
    }

    #[test]
    fn buy_needs_at_least_one_share_of_gap() {
        // Gap of 9,000 at price 10,000: no order.
        let q = buy_quantity(dec!(109000), dec!(100000), dec!(10000), dec!(500000));
        assert_eq!(q, None);
    }

    #[test]
    fn buy_is_capped_by_investable_cash() {
        // Gap 100,000 but only 35,000 investable at price 10,000: 3 shares.
        let q = buy_quantity(dec!(100000), dec!(0), dec!(10000), dec!(35000));
        assert_eq!(q, Some(3));
    }

    #[test]
    fn buy_blocked_when_cash_reserve_would_be_breached() {
        let q = buy_quantity(dec!(100000), dec!(0), dec!(10000), dec!(9999));
        assert_eq!(q, None);
    }

    #[test]
    fn buy_fills_the_gap_when_cash_allows() {
        let q = buy_quantity(dec!(100000), dec!(43000), dec!(10000), dec!(500000));
        assert_eq!(q, Some(5));
    }

    #[test]
    fn signal_sell_full_liquidates() {
        assert_eq!(signal_sell_quantity(7, SellPolicy::Full), Some(7));
    }

    #[test]
    fn signal_sell_half_rounds_up() {
        assert_eq!(signal_sell_quantity(7, SellPolicy::Half), Some(4));
        assert_eq!(signal_sell_quantity(1, SellPolicy::Half), Some(1));
    }

    #[test]
    fn signal_sell_with_nothing_held_is_none() {
        assert_eq!(signal_sell_quantity(0, SellPolicy::Full), None);
    }

    #[test]
    fn overbuy_is_strict_at_the_boundary() {
        // 110,000 held+locked vs 1.1x of 100,000: exactly at, no cancel.
        assert!(!is_overbought(
            dec!(60000),
            dec!(50000),
            dec!(100000),
            dec!(1.1)
        ));
        assert!(is_overbought(
            dec!(60001),
            dec!(50000),
            dec!(100000),
            dec!(1.1)
        ));
    }
}
