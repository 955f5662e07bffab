use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::{StrategyTree, TreeError};
use crate::storage::models::strategy::{Strategy, StrategyInsert};
use crate::storage::repository::DbExecutor;

/// 策略相關錯誤
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// 資料庫錯誤
    #[error("資料庫錯誤: {0}")]
    Database(String),

    /// 策略不存在
    #[error("策略不存在: ID {0}")]
    NotFound(i64),

    /// 名稱衝突
    #[error("策略名稱已存在: {0}")]
    DuplicateName(String),

    /// 層級限制違反（一代限制、自我引用、已有子策略等）
    #[error("無效的層級: 策略 (ID: {offending_id}) {reason}")]
    InvalidHierarchy { offending_id: i64, reason: String },

    /// 策略仍被持股引用，拒絕刪除或改掛父策略
    #[error("策略使用中: ID {strategy_id} 仍被 {stock_count} 檔持股引用")]
    InUse { strategy_id: i64, stock_count: i64 },

    /// 策略本身仍有子策略，拒絕刪除
    #[error("策略尚有子策略: ID {strategy_id} 下仍有 {child_count} 個子策略")]
    HasChildren { strategy_id: i64, child_count: i64 },

    /// 儲存的策略資料違反兩層限制
    #[error("策略樹載入失敗: {0}")]
    Tree(#[from] TreeError),
}

/// 策略儲存庫特徵
#[async_trait]
pub trait StrategyRepository: Send + Sync {
    /// 創建新策略，寫入前檢查名稱唯一與一代層級限制
    async fn create(&self, strategy: &StrategyInsert) -> Result<Strategy, StrategyError>;

    /// 根據ID獲取策略
    async fn get_by_id(&self, id: i64) -> Result<Option<Strategy>, StrategyError>;

    /// 根據名稱獲取策略
    async fn get_by_name(&self, name: &str) -> Result<Option<Strategy>, StrategyError>;

    /// 獲取所有策略（含子策略），依建立順序
    async fn list_all(&self) -> Result<Vec<Strategy>, StrategyError>;

    /// 獲取指定父策略的子策略
    async fn children_of(&self, parent_id: i64) -> Result<Vec<Strategy>, StrategyError>;

    /// 更新策略，重新掛載父策略時套用與創建相同的層級檢查；
    /// 仍被持股引用的策略不可改掛到新的父策略之下
    async fn update(&self, id: i64, strategy: &StrategyInsert) -> Result<Strategy, StrategyError>;

    /// 刪除策略；仍被關聯引用或尚有子策略時拒絕
    async fn delete(&self, id: i64) -> Result<(), StrategyError>;

    /// 載入完整的兩層策略樹
    async fn load_tree(&self) -> Result<StrategyTree, StrategyError>;
}

/// SQLite 策略儲存庫實現
pub struct SqliteStrategyRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteStrategyRepository {
    /// 創建新的策略儲存庫
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

impl DbExecutor for SqliteStrategyRepository {
    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> StrategyError {
    StrategyError::Database(e.to_string())
}

const STRATEGY_COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";

#[async_trait]
impl StrategyRepository for SqliteStrategyRepository {
    async fn create(&self, strategy: &StrategyInsert) -> Result<Strategy, StrategyError> {
        let mut tx = self.get_pool().begin().await.map_err(db_err)?;

        // 名稱必須唯一
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM strategies WHERE name = ?1")
                .bind(&strategy.name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        if existing.is_some() {
            return Err(StrategyError::DuplicateName(strategy.name.clone()));
        }

        // 父策略必須存在且本身為頂層（一代限制）
        if let Some(parent_id) = strategy.parent_id {
            let parent: Option<Option<i64>> =
                sqlx::query_scalar("SELECT parent_id FROM strategies WHERE id = ?1")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
            match parent {
                None => return Err(StrategyError::NotFound(parent_id)),
                Some(Some(_)) => {
                    return Err(StrategyError::InvalidHierarchy {
                        offending_id: parent_id,
                        reason: "本身已是子策略，子策略只能有一代".to_string(),
                    })
                }
                Some(None) => {}
            }
        }

        let now = Utc::now();
        let created = sqlx::query_as::<_, Strategy>(&format!(
            "INSERT INTO strategies (name, description, parent_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {STRATEGY_COLUMNS}"
        ))
        .bind(&strategy.name)
        .bind(&strategy.description)
        .bind(strategy.parent_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Strategy>, StrategyError> {
        sqlx::query_as::<_, Strategy>(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM strategies WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Strategy>, StrategyError> {
        sqlx::query_as::<_, Strategy>(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM strategies WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn list_all(&self) -> Result<Vec<Strategy>, StrategyError> {
        sqlx::query_as::<_, Strategy>(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM strategies ORDER BY id"
        ))
        .fetch_all(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn children_of(&self, parent_id: i64) -> Result<Vec<Strategy>, StrategyError> {
        sqlx::query_as::<_, Strategy>(&format!(
            "SELECT {STRATEGY_COLUMNS} FROM strategies WHERE parent_id = ?1 ORDER BY id"
        ))
        .bind(parent_id)
        .fetch_all(self.get_pool())
        .await
        .map_err(db_err)
    }

    async fn update(&self, id: i64, strategy: &StrategyInsert) -> Result<Strategy, StrategyError> {
        let mut tx = self.get_pool().begin().await.map_err(db_err)?;

        let current_parent: Option<Option<i64>> =
            sqlx::query_scalar("SELECT parent_id FROM strategies WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let Some(current_parent) = current_parent else {
            return Err(StrategyError::NotFound(id));
        };

        // 改名不可撞到其他策略的名稱
        let name_conflict: Option<i64> =
            sqlx::query_scalar("SELECT id FROM strategies WHERE name = ?1 AND id != ?2")
                .bind(&strategy.name)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        if name_conflict.is_some() {
            return Err(StrategyError::DuplicateName(strategy.name.clone()));
        }

        if let Some(parent_id) = strategy.parent_id {
            if parent_id == id {
                return Err(StrategyError::InvalidHierarchy {
                    offending_id: id,
                    reason: "不能以自身作為父策略".to_string(),
                });
            }

            // 父策略必須存在且為頂層；這同時排除了掛到自己子策略底下的循環
            let parent: Option<Option<i64>> =
                sqlx::query_scalar("SELECT parent_id FROM strategies WHERE id = ?1")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
            match parent {
                None => return Err(StrategyError::NotFound(parent_id)),
                Some(Some(_)) => {
                    return Err(StrategyError::InvalidHierarchy {
                        offending_id: parent_id,
                        reason: "本身已是子策略，子策略只能有一代".to_string(),
                    })
                }
                Some(None) => {}
            }

            // 本身已有子策略的頂層策略不能變成子策略，否則會產生第三代
            let child_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM strategies WHERE parent_id = ?1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_err)?;
            if child_count > 0 {
                return Err(StrategyError::InvalidHierarchy {
                    offending_id: id,
                    reason: "本身已有子策略，無法再掛載到其他策略之下".to_string(),
                });
            }

            // 改掛父策略會讓既有關聯集合缺少新的直系祖先，仍被引用時拒絕
            if current_parent != Some(parent_id) {
                let stock_count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM stock_strategy WHERE strategy_id = ?1")
                        .bind(id)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(db_err)?;
                if stock_count > 0 {
                    return Err(StrategyError::InUse {
                        strategy_id: id,
                        stock_count,
                    });
                }
            }
        }

        let now = Utc::now();
        let updated = sqlx::query_as::<_, Strategy>(&format!(
            "UPDATE strategies SET name = ?1, description = ?2, parent_id = ?3, updated_at = ?4 \
             WHERE id = ?5 RETURNING {STRATEGY_COLUMNS}"
        ))
        .bind(&strategy.name)
        .bind(&strategy.description)
        .bind(strategy.parent_id)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), StrategyError> {
        let mut tx = self.get_pool().begin().await.map_err(db_err)?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM strategies WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(StrategyError::NotFound(id));
        }

        let child_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM strategies WHERE parent_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        if child_count > 0 {
            return Err(StrategyError::HasChildren {
                strategy_id: id,
                child_count,
            });
        }

        // 刪除策略不會級聯清理關聯，仍被引用時直接拒絕
        let stock_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_strategy WHERE strategy_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        if stock_count > 0 {
            return Err(StrategyError::InUse {
                strategy_id: id,
                stock_count,
            });
        }

        sqlx::query("DELETE FROM strategies WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn load_tree(&self) -> Result<StrategyTree, StrategyError> {
        let strategies = self.list_all().await?;
        let tree = StrategyTree::from_records(strategies.iter().map(Strategy::to_record))?;
        Ok(tree)
    }
}
