use std::collections::HashMap;

/// 策略的平面記錄，樹的建構輸入
///
/// 儲存層的模型會轉換成這個最小視圖，領域層不直接依賴資料庫型別。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyRecord {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// 頂層策略節點，持有其下的子策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelStrategy {
    pub id: i64,
    pub name: String,
    pub children: Vec<ChildStrategy>,
}

/// 子策略節點，父節點必定是頂層策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildStrategy {
    pub id: i64,
    pub name: String,
    pub parent_id: i64,
}

/// 樹建構錯誤
///
/// 只會在邊界輸入（資料庫資料或外部請求）違反兩層限制時出現。
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    /// 引用了不存在的父策略
    #[error("父策略不存在: 策略 {id} 引用了未知的父策略 {parent_id}")]
    UnknownParent { id: i64, parent_id: i64 },

    /// 父策略本身已是子策略（超過兩層）
    #[error("層級過深: 策略 {id} 的父策略 {parent_id} 本身已是子策略")]
    NestedParent { id: i64, parent_id: i64 },
}

/// 兩層策略樹
///
/// 以明確的頂層/子層結構持有所有策略，深度超過兩層的狀態在這個
/// 型別內無法表示。建構時仍會檢查平面輸入，違反限制直接回傳錯誤。
#[derive(Debug, Clone, Default)]
pub struct StrategyTree {
    roots: Vec<TopLevelStrategy>,
    parents: HashMap<i64, Option<i64>>,
    names: HashMap<i64, String>,
}

impl StrategyTree {
    /// 從平面記錄建構策略樹，保留輸入順序
    pub fn from_records(
        records: impl IntoIterator<Item = StrategyRecord>,
    ) -> Result<Self, TreeError> {
        let records: Vec<StrategyRecord> = records.into_iter().collect();

        let parent_of: HashMap<i64, Option<i64>> =
            records.iter().map(|r| (r.id, r.parent_id)).collect();

        let mut roots = Vec::new();
        let mut root_index: HashMap<i64, usize> = HashMap::new();
        let mut names = HashMap::new();

        for record in &records {
            names.insert(record.id, record.name.clone());
            if record.parent_id.is_none() {
                root_index.insert(record.id, roots.len());
                roots.push(TopLevelStrategy {
                    id: record.id,
                    name: record.name.clone(),
                    children: Vec::new(),
                });
            }
        }

        for record in records {
            let Some(parent_id) = record.parent_id else {
                continue;
            };
            match parent_of.get(&parent_id) {
                None => {
                    return Err(TreeError::UnknownParent {
                        id: record.id,
                        parent_id,
                    })
                }
                Some(Some(_)) => {
                    return Err(TreeError::NestedParent {
                        id: record.id,
                        parent_id,
                    })
                }
                Some(None) => {
                    let idx = root_index[&parent_id];
                    roots[idx].children.push(ChildStrategy {
                        id: record.id,
                        name: record.name,
                        parent_id,
                    });
                }
            }
        }

        Ok(Self {
            roots,
            parents: parent_of,
            names,
        })
    }

    /// 樹中的策略總數（含子策略）
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// 指定的策略是否存在於樹中
    pub fn contains(&self, id: i64) -> bool {
        self.parents.contains_key(&id)
    }

    /// 回傳策略的父策略；頂層策略或未知 id 回傳 None
    pub fn parent_of(&self, id: i64) -> Option<i64> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// 所有頂層策略，依輸入順序
    pub fn roots(&self) -> &[TopLevelStrategy] {
        &self.roots
    }

    /// 指定頂層策略的子策略；未知或本身是子策略則為空
    pub fn children_of(&self, parent_id: i64) -> &[ChildStrategy] {
        self.roots
            .iter()
            .find(|r| r.id == parent_id)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }
}
