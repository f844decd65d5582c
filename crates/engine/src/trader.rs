use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alerter::Notifier;
use api_client::{ApiError, BrokerApi};
use chrono::Utc;
use configuration::{MarketConfig, TradingConfig};
use core_types::{
    Action, BalanceSnapshot, Market, OrderRequest, OrderSide, PendingOrder, Target,
};
use executor::{OrderTracker, TradeLog, TradeRecord};
use market_data::MarketDataCache;
use rebalancer::{IntentKind, RebalanceRules, TradeIntent};
use rust_decimal::Decimal;
use scheduler::SessionClock;
use strategies::{IndicatorFrame, StrategyError, create_strategy};

use crate::error::EngineError;
use crate::report::{self, ProfitBaseline};

/// How a run-cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// The broker rejected an order as a market holiday; the controller
    /// should trip this market's breaker for the rest of the day.
    Holiday,
}

enum SubmitOutcome {
    Submitted,
    Rejected,
    Holiday,
}

/// One market's execution engine: balance, targets, signals, orders.
///
/// Owns every piece of per-market state (bar cache, order tracker, trade log,
/// profit baseline) and is driven one `run_cycle` at a time by the controller.
pub struct MarketTrader {
    market: Market,
    api: Arc<dyn BrokerApi>,
    targets_file: PathBuf,
    trading: TradingConfig,
    rules: RebalanceRules,
    cache: MarketDataCache,
    tracker: OrderTracker,
    trade_log: TradeLog,
    baseline: ProfitBaseline,
    notifier: Notifier,
    clock: SessionClock,
    last_status_report: Option<Instant>,
}

impl MarketTrader {
    pub fn new(
        market: Market,
        api: Arc<dyn BrokerApi>,
        config: &MarketConfig,
        trading: &TradingConfig,
        clock: SessionClock,
        notifier: Notifier,
    ) -> Self {
        let rules = RebalanceRules {
            min_cash_ratio: trading.min_cash_ratio,
            drift_sell_multiple: trading.drift_sell_multiple,
            overbuy_cancel_multiple: trading.overbuy_cancel_multiple,
            max_weight_sum: trading.max_weight_sum,
            sell_policy: trading.sell_policy,
        };
        Self {
            market,
            cache: MarketDataCache::new(Duration::from_secs(trading.refresh_interval_secs)),
            tracker: OrderTracker::new(trading.order_timeout_secs),
            trade_log: TradeLog::new(&trading.data_dir),
            baseline: ProfitBaseline::new(&trading.data_dir, market),
            targets_file: config.targets_file.clone(),
            trading: trading.clone(),
            rules,
            api,
            notifier,
            clock,
            last_status_report: None,
        }
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// One full pass: reconcile orders, clean up, and trade every target.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, EngineError> {
        self.api.authenticate().await?;
        let balance = self.api.get_balance().await?;

        let targets = match self.load_targets() {
            Ok(t) => t,
            Err(e) => {
                self.notifier.enqueue(format!(
                    "🚨 [{}] target file could not be loaded: {e}",
                    self.market.tag()
                ));
                return Err(e);
            }
        };

        let weight_sum = rebalancer::weight_sum(&targets);
        if weight_sum > self.rules.max_weight_sum {
            tracing::warn!(
                market = self.market.tag(),
                %weight_sum,
                "Target weights exceed the configured maximum."
            );
        }

        self.maybe_status_report(&balance, &targets);

        let api = Arc::clone(&self.api);
        self.cache.refresh(&api, &targets).await;

        // Reconcile in-flight orders against the broker's open-order list.
        let open_ids: HashSet<String> = self.api.get_open_orders().await?.into_iter().collect();
        let resolved = self.tracker.resolve(&open_ids, Utc::now());
        for order in &resolved.filled {
            tracing::info!(
                symbol = %order.symbol,
                order_id = %order.order_id,
                "Order left the book; treating as filled."
            );
            self.notifier.enqueue(format!(
                "✅ [{}] {} x{} filled",
                self.market.tag(),
                order.symbol,
                order.quantity
            ));
        }
        for order in &resolved.timed_out {
            // The tracker already released the lock; the cancel is best-effort.
            if let Err(e) = self.api.cancel_order(&order.order_id, &order.symbol).await {
                tracing::warn!(
                    order_id = %order.order_id,
                    error = %e,
                    "Cancel after timeout failed; order already evicted."
                );
            }
            self.notifier.enqueue(format!(
                "⏱️ [{}] {} order timed out after {}s and was cancelled",
                self.market.tag(),
                order.symbol,
                self.trading.order_timeout_secs
            ));
        }

        self.cancel_overbought(&balance, &targets).await;

        // Liquidate holdings that are no longer in the target file.
        for intent in rebalancer::plan_cleanup(&balance, &targets) {
            if self.tracker.has_pending(&intent.symbol) {
                continue;
            }
            if let SubmitOutcome::Holiday = self.submit(&intent, None).await? {
                return Ok(CycleOutcome::Holiday);
            }
        }

        let mut investable = rebalancer::investable_cash(
            balance.cash,
            balance.total_asset,
            self.rules.min_cash_ratio,
            self.tracker.locked_total(),
        );

        for target in &targets {
            // One pending order per symbol; skip until it resolves.
            if self.tracker.has_pending(&target.symbol) {
                continue;
            }

            let quote = match self
                .api
                .get_quote(&target.symbol, target.exchange.as_deref())
                .await
            {
                Ok(q) => q,
                Err(ApiError::NonTradingDay(msg)) => {
                    tracing::info!(market = self.market.tag(), %msg, "Broker reports a holiday.");
                    return Ok(CycleOutcome::Holiday);
                }
                Err(e) => {
                    tracing::warn!(symbol = %target.symbol, error = %e, "Quote fetch failed; skipping symbol.");
                    continue;
                }
            };

            let Some(bars) = self.cache.working_bars(&target.symbol, quote) else {
                tracing::debug!(symbol = %target.symbol, "No cached bars yet; skipping.");
                continue;
            };
            let frame = match IndicatorFrame::compute(&bars) {
                Ok(f) => f,
                Err(StrategyError::InsufficientData { have, need }) => {
                    tracing::debug!(symbol = %target.symbol, have, need, "Not enough history yet.");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(symbol = %target.symbol, error = %e, "Indicator computation failed.");
                    continue;
                }
            };
            let Some((today, yesterday)) = frame.latest_pair() else {
                continue;
            };

            let signal = match create_strategy(&target.strategy)
                .and_then(|s| s.evaluate(today, yesterday))
            {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(symbol = %target.symbol, error = %e, "Strategy evaluation failed.");
                    continue;
                }
            };

            let quantity_held = balance
                .position(&target.symbol)
                .map(|p| p.quantity)
                .unwrap_or(0);
            let target_amount = balance.total_asset * target.target_weight;
            let mut current_amount = Decimal::from(quantity_held) * quote;
            if self.trading.count_pending_in_position {
                current_amount += self.tracker.locked_buy(&target.symbol);
            }

            // Drift trim runs regardless of today's signal.
            if let Some(quantity) = rebalancer::drift_sell_quantity(
                quantity_held,
                quote,
                target_amount,
                self.rules.drift_sell_multiple,
            ) {
                let intent = TradeIntent {
                    symbol: target.symbol.clone(),
                    side: OrderSide::Sell,
                    quantity,
                    price: quote,
                    kind: IntentKind::Drift,
                    reason: "over target weight".to_string(),
                };
                if let SubmitOutcome::Holiday = self.submit(&intent, Some(target)).await? {
                    return Ok(CycleOutcome::Holiday);
                }
                continue;
            }

            match signal.action {
                Action::Buy => {
                    let Some(quantity) = rebalancer::buy_quantity(
                        target_amount,
                        current_amount,
                        quote,
                        investable,
                    ) else {
                        continue;
                    };
                    let intent = TradeIntent {
                        symbol: target.symbol.clone(),
                        side: OrderSide::Buy,
                        quantity,
                        price: quote,
                        kind: IntentKind::Signal,
                        reason: signal.reason.clone(),
                    };
                    match self.submit(&intent, Some(target)).await? {
                        SubmitOutcome::Submitted => {
                            investable -= Decimal::from(quantity) * quote;
                        }
                        SubmitOutcome::Holiday => return Ok(CycleOutcome::Holiday),
                        SubmitOutcome::Rejected => {}
                    }
                }
                Action::Sell => {
                    let Some(quantity) =
                        rebalancer::signal_sell_quantity(quantity_held, self.rules.sell_policy)
                    else {
                        continue;
                    };
                    let intent = TradeIntent {
                        symbol: target.symbol.clone(),
                        side: OrderSide::Sell,
                        quantity,
                        price: quote,
                        kind: IntentKind::Signal,
                        reason: signal.reason.clone(),
                    };
                    if let SubmitOutcome::Holiday = self.submit(&intent, Some(target)).await? {
                        return Ok(CycleOutcome::Holiday);
                    }
                }
                Action::Hold => {}
            }
        }

        Ok(CycleOutcome::Completed)
    }

    /// Cancels pending buys whose position plus locked notional has already
    /// overshot the target.
    async fn cancel_overbought(&mut self, balance: &BalanceSnapshot, targets: &[Target]) {
        let pending_buys: Vec<String> = self
            .tracker
            .iter()
            .filter(|o| o.side == OrderSide::Buy)
            .map(|o| o.symbol.clone())
            .collect();

        for symbol in pending_buys {
            let Some(target) = targets.iter().find(|t| t.symbol == symbol) else {
                continue;
            };
            let target_amount = balance.total_asset * target.target_weight;
            let position_value = balance
                .position(&symbol)
                .map(|p| p.market_value)
                .unwrap_or(Decimal::ZERO);
            if rebalancer::is_overbought(
                position_value,
                self.tracker.locked_buy(&symbol),
                target_amount,
                self.rules.overbuy_cancel_multiple,
            ) && let Some(order) = self.tracker.take(&symbol)
            {
                if let Err(e) = self.api.cancel_order(&order.order_id, &order.symbol).await {
                    tracing::warn!(order_id = %order.order_id, error = %e, "Overbuy cancel failed.");
                }
                self.notifier.enqueue(format!(
                    "⚖️ [{}] pending buy for {} cancelled (overbuy guard)",
                    self.market.tag(),
                    symbol
                ));
            }
        }
    }

    /// Submits one planned trade and records it everywhere it needs to be.
    async fn submit(
        &mut self,
        intent: &TradeIntent,
        target: Option<&Target>,
    ) -> Result<SubmitOutcome, EngineError> {
        let exchange = target.and_then(|t| t.exchange.clone());
        let display_name = target
            .map(|t| t.display_name.as_str())
            .unwrap_or(intent.symbol.as_str());

        let request = OrderRequest {
            symbol: intent.symbol.clone(),
            side: intent.side,
            quantity: intent.quantity,
            price_hint: (self.market == Market::Overseas).then_some(intent.price),
            exchange: exchange.clone(),
        };

        let order_id = match self.api.submit_order(&request).await {
            Ok(id) => id,
            Err(ApiError::NonTradingDay(msg)) => {
                tracing::info!(market = self.market.tag(), %msg, "Broker reports a holiday.");
                return Ok(SubmitOutcome::Holiday);
            }
            Err(e) => {
                tracing::warn!(symbol = %intent.symbol, error = %e, "Order submission failed.");
                self.notifier.enqueue(format!(
                    "❌ [{}] {:?} {} x{} failed: {e}",
                    self.market.tag(),
                    intent.side,
                    display_name,
                    intent.quantity
                ));
                return Ok(SubmitOutcome::Rejected);
            }
        };

        let locked_amount = if intent.side == OrderSide::Buy {
            intent.price * Decimal::from(intent.quantity)
        } else {
            Decimal::ZERO
        };
        self.tracker.record(PendingOrder {
            order_id,
            symbol: intent.symbol.clone(),
            side: intent.side,
            quantity: intent.quantity,
            locked_amount,
            submitted_at: Utc::now(),
            exchange,
        })?;

        let kind_label = match (intent.kind, intent.side) {
            (IntentKind::Cleanup, _) => "Sell(Cleanup)",
            (IntentKind::Drift, _) => "Sell(Rebalance)",
            (IntentKind::Signal, OrderSide::Buy) => "Buy",
            (IntentKind::Signal, OrderSide::Sell) => "Sell",
        };
        let record = TradeRecord::new(
            self.clock.local(Utc::now()),
            kind_label,
            display_name,
            intent.price,
            intent.quantity,
            intent.reason.clone(),
        );
        if let Err(e) = self.trade_log.record(&record) {
            tracing::warn!(error = %e, "Trade log append failed.");
        }

        let icon = match (intent.kind, intent.side) {
            (IntentKind::Cleanup, _) => "🧹",
            (IntentKind::Drift, _) => "⚖️",
            (IntentKind::Signal, OrderSide::Buy) => "🚀",
            (IntentKind::Signal, OrderSide::Sell) => "💧",
        };
        self.notifier.enqueue(format!(
            "{icon} [{}] {kind_label} {display_name} x{} @ {} ({})",
            self.market.tag(),
            intent.quantity,
            intent.price,
            intent.reason
        ));

        Ok(SubmitOutcome::Submitted)
    }

    fn load_targets(&self) -> Result<Vec<Target>, EngineError> {
        let targets = configuration::load_targets(&self.targets_file)?;
        if targets.is_empty() {
            return Err(EngineError::MissingTargets(self.market.tag()));
        }
        Ok(targets)
    }

    /// Queues the periodic portfolio status report when its interval is due.
    /// The first cycle of a session always sends one.
    fn maybe_status_report(&mut self, balance: &BalanceSnapshot, targets: &[Target]) {
        let interval = Duration::from_secs(self.trading.status_report_interval_secs);
        let due = self
            .last_status_report
            .map(|t| t.elapsed() >= interval)
            .unwrap_or(true);
        if due {
            self.notifier
                .enqueue(report::status_report(self.market, balance, targets));
            self.last_status_report = Some(Instant::now());
        }
    }

    /// The pre-open report: today's target book.
    pub fn preopen_report(&self) -> Result<String, EngineError> {
        let targets = self.load_targets()?;
        Ok(report::targets_report(self.market, &targets))
    }

    /// The post-close settlement report, measured against the profit baseline.
    pub async fn closing_report(&self) -> Result<String, EngineError> {
        self.api.authenticate().await?;
        let balance = self.api.get_balance().await?;
        let today = self.clock.local_date(Utc::now());
        let (profit, rate) = self.baseline.cumulative(balance.total_asset, today)?;
        Ok(report::closing_report(self.market, &balance, profit, rate))
    }
}
