use chrono::{DateTime, Duration, Utc};
use core_types::PendingOrder;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;

/// Orders the broker has resolved since the last cycle, split by outcome.
#[derive(Debug, Default)]
pub struct ResolvedOrders {
    /// No longer in the broker's open-order list: treated as filled.
    pub filled: Vec<PendingOrder>,
    /// Still open past the timeout. Already removed here; the caller is
    /// expected to fire a cancel, but the lock is released either way.
    pub timed_out: Vec<PendingOrder>,
}

/// The single owner of every in-flight order and its locked notional.
///
/// One pending order per symbol, enforced at insert. Removal from the map is
/// the one and only release of an order's `locked_amount`, so a lock can never
/// leak or be released twice.
pub struct OrderTracker {
    pending: HashMap<String, PendingOrder>,
    timeout: Duration,
}

impl OrderTracker {
    pub fn new(timeout_secs: i64) -> Self {
        Self {
            pending: HashMap::new(),
            timeout: Duration::seconds(timeout_secs),
        }
    }

    pub fn has_pending(&self, symbol: &str) -> bool {
        self.pending.contains_key(symbol)
    }

    /// Total notional locked by in-flight buys across all symbols.
    pub fn locked_total(&self) -> Decimal {
        self.pending.values().map(|o| o.locked_amount).sum()
    }

    /// The notional locked by this symbol's pending buy, zero if none.
    pub fn locked_buy(&self, symbol: &str) -> Decimal {
        self.pending
            .get(symbol)
            .map(|o| o.locked_amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOrder> {
        self.pending.values()
    }

    /// Registers a freshly submitted order. Rejected if the symbol already
    /// has one in flight.
    pub fn record(&mut self, order: PendingOrder) -> Result<(), ExecutorError> {
        if self.pending.contains_key(&order.symbol) {
            return Err(ExecutorError::DuplicatePending(order.symbol));
        }
        tracing::debug!(
            symbol = %order.symbol,
            order_id = %order.order_id,
            locked = %order.locked_amount,
            "Tracking pending order."
        );
        self.pending.insert(order.symbol.clone(), order);
        Ok(())
    }

    /// Reconciles every pending order against the broker's open-order list.
    ///
    /// An order absent from the list has left the book, which this engine
    /// reads as a fill. An order still on the book past the timeout is
    /// evicted so its lock cannot outlive the cycle that cancels it.
    pub fn resolve(
        &mut self,
        open_order_ids: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> ResolvedOrders {
        let mut resolved = ResolvedOrders::default();

        let done: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, order)| {
                !open_order_ids.contains(&order.order_id)
                    || now - order.submitted_at >= self.timeout
            })
            .map(|(symbol, _)| symbol.clone())
            .collect();

        for symbol in done {
            if let Some(order) = self.pending.remove(&symbol) {
                if open_order_ids.contains(&order.order_id) {
                    resolved.timed_out.push(order);
                } else {
                    resolved.filled.push(order);
                }
            }
        }

        resolved
    }

    /// Pulls a pending order out for an explicit cancel (e.g. the overbuy
    /// guard). The lock is released by the removal itself.
    pub fn take(&mut self, symbol: &str) -> Option<PendingOrder> {
        self.pending.remove(symbol)
    }
}
