use std::collections::HashSet;

use crate::domain::strategy::StrategyTree;

/// 關聯集合驗證錯誤，一律帶出違規的策略 id
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// 候選集合中引用了不存在的策略
    #[error("策略不存在: ID {0}")]
    UnknownStrategy(i64),

    /// 子策略被選取但父策略不在同一集合中
    #[error("子策略 (ID: {child}) 需要其父策略 (ID: {parent}) 一併選取")]
    MissingParent { child: i64, parent: i64 },
}

impl HierarchyError {
    /// 違規的策略 id
    pub fn offending_id(&self) -> i64 {
        match self {
            HierarchyError::UnknownStrategy(id) => *id,
            HierarchyError::MissingParent { child, .. } => *child,
        }
    }
}

/// 驗證候選關聯集合是否滿足直系祖先約束
///
/// 檢查針對整個候選集合而非增量：子策略的父策略即使存在於系統中，
/// 只要不在這次的集合裡就一律拒絕。重複的 id 視為集合處理，
/// 空集合永遠合法。
pub fn validate_associations(
    tree: &StrategyTree,
    candidate_ids: &[i64],
) -> Result<(), HierarchyError> {
    let selected: HashSet<i64> = candidate_ids.iter().copied().collect();

    for &id in &selected {
        if !tree.contains(id) {
            return Err(HierarchyError::UnknownStrategy(id));
        }
        if let Some(parent) = tree.parent_of(id) {
            if !selected.contains(&parent) {
                return Err(HierarchyError::MissingParent { child: id, parent });
            }
        }
    }

    Ok(())
}

/// 去除重複 id 並保留首次出現順序，儲存層以此結果寫入關聯
pub fn dedup_preserving_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}
