//! The dual-market controller.
//!
//! One loop, two venues: the controller watches the session clock, drives
//! whichever market is open through its trader's run-cycles, fires the
//! scheduled daily reports, and trips a per-market holiday breaker when the
//! broker says there is no session today.

pub mod error;
pub mod report;
pub mod trader;

pub use error::EngineError;
pub use trader::{CycleOutcome, MarketTrader};

use alerter::Notifier;
use chrono::{DateTime, Utc};
use configuration::TradingConfig;
use core_types::Market;
use scheduler::{MarketStatus, ReportKind, SessionClock, SessionState};
use std::time::Duration;

pub struct Controller {
    domestic: MarketTrader,
    overseas: MarketTrader,
    clock: SessionClock,
    state: SessionState,
    notifier: Notifier,
    cycle_pause: Duration,
    holiday_poll: Duration,
    idle_poll: Duration,
    error_cooldown: Duration,
}

impl Controller {
    pub fn new(
        domestic: MarketTrader,
        overseas: MarketTrader,
        clock: SessionClock,
        notifier: Notifier,
        trading: &TradingConfig,
    ) -> Self {
        Self {
            domestic,
            overseas,
            clock,
            state: SessionState::new(),
            notifier,
            cycle_pause: Duration::from_millis(trading.cycle_pause_ms),
            holiday_poll: Duration::from_secs(trading.holiday_poll_secs),
            idle_poll: Duration::from_secs(60),
            error_cooldown: Duration::from_secs(trading.error_cooldown_secs),
        }
    }

    /// Runs forever. Every failure path inside `tick` degrades to a longer
    /// sleep, never to an exit.
    pub async fn run(mut self) {
        tracing::info!("Controller started.");
        loop {
            let pause = self.tick(Utc::now()).await;
            tokio::time::sleep(pause).await;
        }
    }

    /// One scheduling decision: reports due now, then at most one run-cycle.
    /// Returns how long the loop should sleep before the next tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Duration {
        let today = self.clock.local_date(now);
        if self.state.roll_day(today) {
            tracing::info!(%today, "New trading day; holiday breakers reset.");
        }

        if let Some(kind) = self.clock.report_window(now)
            && !self.state.report_sent(kind)
        {
            self.send_report(kind).await;
        }

        match self.clock.status(now) {
            MarketStatus::Idle => self.idle_poll,
            MarketStatus::DomesticActive => self.drive(Market::Domestic).await,
            MarketStatus::OverseasActive => self.drive(Market::Overseas).await,
        }
    }

    async fn drive(&mut self, market: Market) -> Duration {
        if self.state.is_holiday(market) {
            return self.holiday_poll;
        }

        let trader = match market {
            Market::Domestic => &mut self.domestic,
            Market::Overseas => &mut self.overseas,
        };

        match trader.run_cycle().await {
            Ok(CycleOutcome::Completed) => self.cycle_pause,
            Ok(CycleOutcome::Holiday) => {
                tracing::info!(market = market.tag(), "Holiday breaker tripped for today.");
                self.state.mark_holiday(market);
                self.notifier.enqueue(format!(
                    "⛔ [{}] market holiday detected; trading paused until tomorrow.",
                    market.tag()
                ));
                self.holiday_poll
            }
            Err(e) => {
                tracing::error!(market = market.tag(), error = %e, "Run-cycle failed.");
                self.notifier
                    .enqueue(format!("🚨 [{}] cycle error: {e}", market.tag()));
                self.error_cooldown
            }
        }
    }

    /// Builds and queues a scheduled report, marking it sent only on
    /// success so a transient failure retries within the window.
    async fn send_report(&mut self, kind: ReportKind) {
        let result = match kind {
            ReportKind::DomesticPreOpen => self.domestic.preopen_report(),
            ReportKind::OverseasPreOpen => self.overseas.preopen_report(),
            ReportKind::DomesticClose => self.domestic.closing_report().await,
            ReportKind::OverseasClose => self.overseas.closing_report().await,
        };
        match result {
            Ok(message) => {
                self.notifier.enqueue(message);
                self.state.claim_report(kind);
            }
            Err(e) => {
                tracing::warn!(?kind, error = %e, "Scheduled report failed; will retry.");
            }
        }
    }
}
