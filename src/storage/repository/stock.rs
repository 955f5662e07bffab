use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::domain::{
    dedup_preserving_order, validate_associations, HierarchyError, StrategyRecord, StrategyTree,
    TreeError,
};
use crate::storage::models::stock::{Stock, StockComplete, StockInsert};
use crate::storage::repository::DbExecutor;

/// 持股相關錯誤
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    /// 資料庫錯誤
    #[error("資料庫錯誤: {0}")]
    Database(String),

    /// 持股不存在
    #[error("持股不存在: ID {0}")]
    NotFound(i64),

    /// 關聯集合違反直系祖先約束
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// 代號已被其他持股使用
    #[error("代號已被其他持股使用: {0}")]
    TickerConflict(String),

    /// 儲存的策略資料違反兩層限制
    #[error("策略樹載入失敗: {0}")]
    Tree(#[from] TreeError),
}

/// 持股儲存庫特徵
///
/// 關聯集合採全量替換語義：每次變更都帶入完整的目標集合，
/// 清除加寫入在同一交易內完成，讀取端不會看到中間狀態。
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// 創建持股並寫入初始關聯集合（可為空）
    async fn create(
        &self,
        stock: &StockInsert,
        strategy_ids: &[i64],
    ) -> Result<StockComplete, StockError>;

    /// 根據ID獲取持股
    async fn get_by_id(&self, id: i64) -> Result<Option<StockComplete>, StockError>;

    /// 根據代號獲取持股
    async fn get_by_ticker(&self, ticker: &str) -> Result<Option<StockComplete>, StockError>;

    /// 獲取所有持股
    async fn list_all(&self) -> Result<Vec<StockComplete>, StockError>;

    /// 全量更新持股欄位並原子替換關聯集合
    async fn update(
        &self,
        id: i64,
        stock: &StockInsert,
        strategy_ids: &[i64],
    ) -> Result<StockComplete, StockError>;

    /// 刪除持股（不影響策略本身）
    async fn delete(&self, id: i64) -> Result<(), StockError>;
}

/// SQLite 持股儲存庫實現
pub struct SqliteStockRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteStockRepository {
    /// 創建新的持股儲存庫
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

impl DbExecutor for SqliteStockRepository {
    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> StockError {
    StockError::Database(e.to_string())
}

const STOCK_COLUMNS: &str =
    "id, ticker, name, quantity, acquisition_price, category, created_at, updated_at";

/// 在交易內以當下的策略資料驗證候選關聯集合
///
/// 驗證與寫入共用同一交易，策略在驗證後、提交前被改動的寫入
/// 會被資料庫的單寫入者語義擋下。
async fn validate_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    strategy_ids: &[i64],
) -> Result<(), StockError> {
    let records: Vec<(i64, String, Option<i64>)> =
        sqlx::query_as("SELECT id, name, parent_id FROM strategies ORDER BY id")
            .fetch_all(&mut **tx)
            .await
            .map_err(db_err)?;

    let tree = StrategyTree::from_records(records.into_iter().map(|(id, name, parent_id)| {
        StrategyRecord {
            id,
            name,
            parent_id,
        }
    }))?;

    validate_associations(&tree, strategy_ids)?;
    Ok(())
}

/// 清除既有關聯後寫入新集合，呼叫端負責提交交易
async fn replace_links_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    stock_id: i64,
    strategy_ids: &[i64],
) -> Result<Vec<i64>, StockError> {
    sqlx::query("DELETE FROM stock_strategy WHERE stock_id = ?1")
        .bind(stock_id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    let deduped = dedup_preserving_order(strategy_ids);
    for strategy_id in &deduped {
        sqlx::query("INSERT INTO stock_strategy (stock_id, strategy_id) VALUES (?1, ?2)")
            .bind(stock_id)
            .bind(strategy_id)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }

    Ok(deduped)
}

impl SqliteStockRepository {
    async fn strategy_ids_of(&self, stock_id: i64) -> Result<Vec<i64>, StockError> {
        sqlx::query_scalar(
            "SELECT strategy_id FROM stock_strategy WHERE stock_id = ?1 ORDER BY strategy_id",
        )
        .bind(stock_id)
        .fetch_all(self.get_pool())
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl StockRepository for SqliteStockRepository {
    async fn create(
        &self,
        stock: &StockInsert,
        strategy_ids: &[i64],
    ) -> Result<StockComplete, StockError> {
        let mut tx = self.get_pool().begin().await.map_err(db_err)?;

        validate_in_tx(&mut tx, strategy_ids).await?;

        let now = Utc::now();
        let created = sqlx::query_as::<_, Stock>(&format!(
            "INSERT INTO stocks (ticker, name, quantity, acquisition_price, category, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {STOCK_COLUMNS}"
        ))
        .bind(&stock.ticker)
        .bind(&stock.name)
        .bind(stock.quantity)
        .bind(stock.acquisition_price)
        .bind(stock.category_or_default())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut linked = replace_links_in_tx(&mut tx, created.id, strategy_ids).await?;
        linked.sort_unstable();

        tx.commit().await.map_err(db_err)?;

        Ok(StockComplete {
            stock: created,
            strategy_ids: linked,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StockComplete>, StockError> {
        let stock = sqlx::query_as::<_, Stock>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stocks WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await
        .map_err(db_err)?;

        match stock {
            None => Ok(None),
            Some(stock) => {
                let strategy_ids = self.strategy_ids_of(stock.id).await?;
                Ok(Some(StockComplete {
                    stock,
                    strategy_ids,
                }))
            }
        }
    }

    async fn get_by_ticker(&self, ticker: &str) -> Result<Option<StockComplete>, StockError> {
        let stock = sqlx::query_as::<_, Stock>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stocks WHERE ticker = ?1 ORDER BY id LIMIT 1"
        ))
        .bind(ticker)
        .fetch_optional(self.get_pool())
        .await
        .map_err(db_err)?;

        match stock {
            None => Ok(None),
            Some(stock) => {
                let strategy_ids = self.strategy_ids_of(stock.id).await?;
                Ok(Some(StockComplete {
                    stock,
                    strategy_ids,
                }))
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<StockComplete>, StockError> {
        let stocks = sqlx::query_as::<_, Stock>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stocks ORDER BY id"
        ))
        .fetch_all(self.get_pool())
        .await
        .map_err(db_err)?;

        let links: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT stock_id, strategy_id FROM stock_strategy ORDER BY stock_id, strategy_id",
        )
        .fetch_all(self.get_pool())
        .await
        .map_err(db_err)?;

        let mut by_stock: HashMap<i64, Vec<i64>> = HashMap::new();
        for (stock_id, strategy_id) in links {
            by_stock.entry(stock_id).or_default().push(strategy_id);
        }

        Ok(stocks
            .into_iter()
            .map(|stock| {
                let strategy_ids = by_stock.remove(&stock.id).unwrap_or_default();
                StockComplete {
                    stock,
                    strategy_ids,
                }
            })
            .collect())
    }

    async fn update(
        &self,
        id: i64,
        stock: &StockInsert,
        strategy_ids: &[i64],
    ) -> Result<StockComplete, StockError> {
        let mut tx = self.get_pool().begin().await.map_err(db_err)?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM stocks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(StockError::NotFound(id));
        }

        // 代號是功能性主鍵，不可改成其他持股已登錄的代號
        let ticker_conflict: Option<i64> =
            sqlx::query_scalar("SELECT id FROM stocks WHERE ticker = ?1 AND id != ?2")
                .bind(&stock.ticker)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        if ticker_conflict.is_some() {
            return Err(StockError::TickerConflict(stock.ticker.clone()));
        }

        validate_in_tx(&mut tx, strategy_ids).await?;

        let now = Utc::now();
        let updated = sqlx::query_as::<_, Stock>(&format!(
            "UPDATE stocks SET ticker = ?1, name = ?2, quantity = ?3, acquisition_price = ?4, \
             category = ?5, updated_at = ?6 WHERE id = ?7 RETURNING {STOCK_COLUMNS}"
        ))
        .bind(&stock.ticker)
        .bind(&stock.name)
        .bind(stock.quantity)
        .bind(stock.acquisition_price)
        .bind(stock.category_or_default())
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut linked = replace_links_in_tx(&mut tx, id, strategy_ids).await?;
        linked.sort_unstable();

        tx.commit().await.map_err(db_err)?;

        Ok(StockComplete {
            stock: updated,
            strategy_ids: linked,
        })
    }

    async fn delete(&self, id: i64) -> Result<(), StockError> {
        let mut tx = self.get_pool().begin().await.map_err(db_err)?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM stocks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(StockError::NotFound(id));
        }

        sqlx::query("DELETE FROM stock_strategy WHERE stock_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM stocks WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
