use std::sync::Arc;

use sqlx::SqlitePool;

use crate::market_data::QuoteProvider;
use crate::storage::repository::{
    AllocationRepository, SqliteAllocationRepository, SqliteStockRepository,
    SqliteStrategyRepository, StockRepository, StrategyRepository,
};

/// 各處理器共享的應用狀態
///
/// 倉儲與報價來源都以特徵物件持有，測試可以替換成替身實現。
#[derive(Clone)]
pub struct AppState {
    pub strategies: Arc<dyn StrategyRepository>,
    pub stocks: Arc<dyn StockRepository>,
    pub allocations: Arc<dyn AllocationRepository>,
    pub quotes: Arc<dyn QuoteProvider>,
}

impl AppState {
    /// 以 SQLite 倉儲與指定的報價來源建立應用狀態
    pub fn new(pool: SqlitePool, quotes: Arc<dyn QuoteProvider>) -> Self {
        let pool = Arc::new(pool);
        Self {
            strategies: Arc::new(SqliteStrategyRepository::new(pool.clone())),
            stocks: Arc::new(SqliteStockRepository::new(pool.clone())),
            allocations: Arc::new(SqliteAllocationRepository::new(pool)),
            quotes,
        }
    }
}
