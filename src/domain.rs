// domain.rs - 核心領域模組，宣告子模組
//
// 與儲存層和傳輸層無關的純計算：
// - 兩層策略樹（頂層/子層的標記結構）
// - 關聯集合的直系祖先約束驗證
// - 資產配置的現況/目標比較計算

/// 配置聚合計算
pub mod allocation;
/// 關聯集合驗證
pub mod hierarchy;
/// 兩層策略樹
pub mod strategy;

pub use allocation::{
    combined_view, current_composition, round2, CategoryWeight, ComparisonRow, HoldingSnapshot,
    TargetWeight,
};
pub use hierarchy::{dedup_preserving_order, validate_associations, HierarchyError};
pub use strategy::{ChildStrategy, StrategyRecord, StrategyTree, TopLevelStrategy, TreeError};
