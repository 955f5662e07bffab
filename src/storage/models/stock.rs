use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::HoldingSnapshot;

/// 未指定分類時的預設值
pub const DEFAULT_CATEGORY: &str = "未分類";

/// 持股模型
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub id: i64,
    pub ticker: String,
    pub name: Option<String>,
    pub quantity: i64,
    pub acquisition_price: f64,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// 轉換為配置計算用的持倉視圖
    pub fn holding_snapshot(&self) -> HoldingSnapshot {
        HoldingSnapshot {
            stock_id: self.id,
            category: self.category.clone(),
            quantity: self.quantity,
            acquisition_price: self.acquisition_price,
        }
    }
}

/// 含關聯集合的完整持股
#[derive(Debug, Clone, Serialize)]
pub struct StockComplete {
    #[serde(flatten)]
    pub stock: Stock,
    pub strategy_ids: Vec<i64>,
}

/// 持股插入模型
///
/// 更新時同樣使用這個模型，欄位全量替換而非差異補丁。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInsert {
    pub ticker: String,
    pub name: Option<String>,
    pub quantity: i64,
    pub acquisition_price: f64,
    pub category: Option<String>,
}

impl StockInsert {
    /// 實際寫入的分類，未提供時使用預設值
    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}
