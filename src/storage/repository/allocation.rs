use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::storage::models::allocation::TargetAllocation;
use crate::storage::repository::DbExecutor;

/// 目標配置相關錯誤
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// 資料庫錯誤
    #[error("資料庫錯誤: {0}")]
    Database(String),

    /// 指定分類沒有目標配置
    #[error("目標配置不存在: {0}")]
    NotFound(String),
}

/// 目標配置儲存庫特徵
#[async_trait]
pub trait AllocationRepository: Send + Sync {
    /// 以分類為鍵寫入或更新目標比率
    async fn upsert(&self, allocation: &TargetAllocation)
        -> Result<TargetAllocation, AllocationError>;

    /// 根據分類獲取目標配置
    async fn get_by_category(
        &self,
        category: &str,
    ) -> Result<Option<TargetAllocation>, AllocationError>;

    /// 獲取所有目標配置
    async fn list_all(&self) -> Result<Vec<TargetAllocation>, AllocationError>;

    /// 刪除指定分類的目標配置
    async fn delete(&self, category: &str) -> Result<(), AllocationError>;
}

/// SQLite 目標配置儲存庫實現
pub struct SqliteAllocationRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteAllocationRepository {
    /// 創建新的目標配置儲存庫
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

impl DbExecutor for SqliteAllocationRepository {
    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> AllocationError {
    AllocationError::Database(e.to_string())
}

#[async_trait]
impl AllocationRepository for SqliteAllocationRepository {
    async fn upsert(
        &self,
        allocation: &TargetAllocation,
    ) -> Result<TargetAllocation, AllocationError> {
        sqlx::query_as::<_, TargetAllocation>(
            "INSERT INTO target_allocations (category, percentage) VALUES (?1, ?2) \
             ON CONFLICT (category) DO UPDATE SET percentage = excluded.percentage \
             RETURNING category, percentage",
        )
        .bind(&allocation.category)
        .bind(allocation.percentage)
        .fetch_one(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn get_by_category(
        &self,
        category: &str,
    ) -> Result<Option<TargetAllocation>, AllocationError> {
        sqlx::query_as::<_, TargetAllocation>(
            "SELECT category, percentage FROM target_allocations WHERE category = ?1",
        )
        .bind(category)
        .fetch_optional(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn list_all(&self) -> Result<Vec<TargetAllocation>, AllocationError> {
        sqlx::query_as::<_, TargetAllocation>(
            "SELECT category, percentage FROM target_allocations ORDER BY category",
        )
        .fetch_all(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn delete(&self, category: &str) -> Result<(), AllocationError> {
        let result = sqlx::query("DELETE FROM target_allocations WHERE category = ?1")
            .bind(category)
            .execute(self.get_pool())
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(AllocationError::NotFound(category.to_string()));
        }
        Ok(())
    }
}
