pub mod database;
pub mod migrations;
pub mod models;
pub mod repository;

// 只匯出必要的數據庫功能
pub use database::{init_pool, DatabasePool};

// 匯出主要的模型
pub use models::{Stock, StockComplete, StockInsert, Strategy, StrategyInsert, TargetAllocation};

// 匯出主要的倉儲接口和實現
pub use repository::{
    AllocationError, AllocationRepository, DbExecutor, SqliteAllocationRepository,
    SqliteStockRepository, SqliteStrategyRepository, StockError, StockRepository, StrategyError,
    StrategyRepository,
};

// 匯出遷移功能
pub use migrations::run_migrations;
