use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use portfolio_server::storage::repository::{
    SqliteAllocationRepository, SqliteStockRepository, SqliteStrategyRepository,
    StrategyRepository,
};
use portfolio_server::storage::run_migrations;
use portfolio_server::storage::{Strategy, StrategyInsert};

/// 建立記憶體資料庫並套用遷移
///
/// 記憶體資料庫跟著連線走，固定一條常駐連線避免資料被回收。
pub async fn setup_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Failed to parse database options")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to create test database pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn strategy_repo(pool: &SqlitePool) -> SqliteStrategyRepository {
    SqliteStrategyRepository::new(Arc::new(pool.clone()))
}

pub fn stock_repo(pool: &SqlitePool) -> SqliteStockRepository {
    SqliteStockRepository::new(Arc::new(pool.clone()))
}

pub fn allocation_repo(pool: &SqlitePool) -> SqliteAllocationRepository {
    SqliteAllocationRepository::new(Arc::new(pool.clone()))
}

/// 建立策略的簡便包裝
pub async fn create_strategy(
    repo: &SqliteStrategyRepository,
    name: &str,
    parent_id: Option<i64>,
) -> Strategy {
    repo.create(&StrategyInsert {
        name: name.to_string(),
        description: None,
        parent_id,
    })
    .await
    .expect("Failed to create strategy")
}
