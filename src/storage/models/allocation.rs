use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::TargetWeight;

/// 目標配置模型，以分類為主鍵
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TargetAllocation {
    pub category: String,
    pub percentage: f64,
}

impl TargetAllocation {
    /// 轉換為配置計算用的目標視圖
    pub fn to_weight(&self) -> TargetWeight {
        TargetWeight {
            category: self.category.clone(),
            percentage: self.percentage,
        }
    }
}
