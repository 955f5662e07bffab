use sqlx::SqlitePool;

// 重新導出子模塊
pub mod allocation;
pub mod stock;
pub mod strategy;

// 重新導出常用類型
pub use allocation::{AllocationError, AllocationRepository, SqliteAllocationRepository};
pub use stock::{SqliteStockRepository, StockError, StockRepository};
pub use strategy::{SqliteStrategyRepository, StrategyError, StrategyRepository};

/// 通用的數據庫操作特性
pub trait DbExecutor {
    fn get_pool(&self) -> &SqlitePool;
}
