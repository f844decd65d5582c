//! Order lifecycle bookkeeping.
//!
//! The tracker is the sole authority on which orders are in flight and how
//! much cash they have spoken for; the trade log is the audit trail of every
//! submission. Neither talks to the broker; the engine wires them to it.

pub mod error;
pub mod tracker;
pub mod trade_log;

pub use error::ExecutorError;
pub use tracker::{OrderTracker, ResolvedOrders};
pub use trade_log::{TradeLog, TradeRecord};
