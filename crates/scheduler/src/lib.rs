//! Session windows, day rollover, and per-day report bookkeeping.
//!
//! Everything is a pure function of a `DateTime<Utc>` plus the configured
//! UTC offset, so every window is unit-testable without a clock. The engine
//! feeds in `Utc::now()`; the tests feed in whatever they like.
//!
//! All windows are expressed in the account's home timezone (Seoul for the
//! reference deployment): the domestic session runs during the local day and
//! the overseas session overnight, which is why it straddles midnight.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};
use core_types::Market;
use std::collections::HashSet;

/// Which venue, if any, is tradeable right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    DomesticActive,
    OverseasActive,
    Idle,
}

impl MarketStatus {
    pub fn market(self) -> Option<Market> {
        match self {
            MarketStatus::DomesticActive => Some(Market::Domestic),
            MarketStatus::OverseasActive => Some(Market::Overseas),
            MarketStatus::Idle => None,
        }
    }
}

/// The four scheduled one-shot reports of a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    DomesticPreOpen,
    DomesticClose,
    OverseasPreOpen,
    OverseasClose,
}

/// Converts instants into session decisions for one configured home offset.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    offset: FixedOffset,
}

impl SessionClock {
    pub fn new(utc_offset_hours: i32) -> Self {
        // A bad offset in config would have failed validation long before
        // this; fall back to UTC rather than panic.
        let offset =
            FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Self { offset }
    }

    pub fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset)
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    /// Which market is active at this instant.
    ///
    /// Weekends are idle, with one exception: the overseas session that
    /// opened Friday night is still running in the small hours of Saturday.
    pub fn status(&self, now: DateTime<Utc>) -> MarketStatus {
        let local = self.local(now);
        let hm = hm(local);
        let weekday = local.weekday();

        if matches!(weekday, Weekday::Sat | Weekday::Sun)
            && !(weekday == Weekday::Sat && hm <= 600)
        {
            return MarketStatus::Idle;
        }

        if (900..=1530).contains(&hm) {
            return MarketStatus::DomesticActive;
        }
        if hm >= 2330 || hm <= 600 {
            return MarketStatus::OverseasActive;
        }

        MarketStatus::Idle
    }

    /// The scheduled report whose window covers this instant, if any.
    pub fn report_window(&self, now: DateTime<Utc>) -> Option<ReportKind> {
        let local = self.local(now);
        let hm = hm(local);
        let weekday = local.weekday();
        let is_weekday = !matches!(weekday, Weekday::Sat | Weekday::Sun);

        if is_weekday && (830..900).contains(&hm) {
            return Some(ReportKind::DomesticPreOpen);
        }
        if is_weekday && (1545..1600).contains(&hm) {
            return Some(ReportKind::DomesticClose);
        }
        if is_weekday && (2300..2330).contains(&hm) {
            return Some(ReportKind::OverseasPreOpen);
        }
        // The overseas close lands Saturday morning after a Friday session.
        if (is_weekday || weekday == Weekday::Sat) && (605..700).contains(&hm) {
            return Some(ReportKind::OverseasClose);
        }

        None
    }
}

fn hm(local: DateTime<FixedOffset>) -> u32 {
    local.hour() * 100 + local.minute()
}

/// Per-day flags: holiday circuit breakers and which reports already went out.
///
/// Everything resets when the local date rolls over, so a holiday only mutes
/// one day and every report fires at most once per day.
#[derive(Debug, Default)]
pub struct SessionState {
    last_date: Option<NaiveDate>,
    domestic_holiday: bool,
    overseas_holiday: bool,
    sent_reports: HashSet<ReportKind>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to `today`, clearing day-scoped flags if the date changed.
    /// Returns true on rollover.
    pub fn roll_day(&mut self, today: NaiveDate) -> bool {
        if self.last_date == Some(today) {
            return false;
        }
        self.last_date = Some(today);
        self.domestic_holiday = false;
        self.overseas_holiday = false;
        self.sent_reports.clear();
        true
    }

    pub fn mark_holiday(&mut self, market: Market) {
        match market {
            Market::Domestic => self.domestic_holiday = true,
            Market::Overseas => self.overseas_holiday = true,
        }
    }

    pub fn is_holiday(&self, market: Market) -> bool {
        match market {
            Market::Domestic => self.domestic_holiday,
            Market::Overseas => self.overseas_holiday,
        }
    }

    pub fn report_sent(&self, kind: ReportKind) -> bool {
        self.sent_reports.contains(&kind)
    }

    /// True exactly once per day per report kind.
    pub fn claim_report(&mut self, kind: ReportKind) -> bool {
        self.sent_reports.insert(kind)
    }
}
