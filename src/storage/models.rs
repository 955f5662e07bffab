pub mod allocation;
pub mod stock;
pub mod strategy;

pub use allocation::TargetAllocation;
pub use stock::{Stock, StockComplete, StockInsert, DEFAULT_CATEGORY};
pub use strategy::{Strategy, StrategyInsert};
