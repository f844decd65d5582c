pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Action, Market, OrderSide, SellPolicy, StrategyId};
pub use structs::{
    BalanceSnapshot, Bar, BreakoutParams, MacdRsiParams, MomentumParams, OrderRequest,
    PendingOrder, Position, ProfitSummary, Signal, StrategySpec, Target,
};
