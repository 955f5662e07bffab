use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::StrategyRecord;

/// 策略模型
///
/// `parent_id` 有值時代表子策略，層級限制由倉儲在寫入前檢查。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Strategy {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Strategy {
    /// 轉換為領域層的平面記錄
    pub fn to_record(&self) -> StrategyRecord {
        StrategyRecord {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
        }
    }
}

/// 策略插入模型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInsert {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}
