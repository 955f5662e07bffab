use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

/// 計算輸入的最小持倉視圖
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingSnapshot {
    pub stock_id: i64,
    pub category: String,
    pub quantity: i64,
    pub acquisition_price: f64,
}

/// 目標配置的最小視圖
#[derive(Debug, Clone, PartialEq)]
pub struct TargetWeight {
    pub category: String,
    pub percentage: f64,
}

/// 單一分類的現況比重
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWeight {
    pub category: String,
    pub percentage: f64,
}

/// 現況與目標的比較列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub category: String,
    pub current_percentage: f64,
    pub target_percentage: f64,
}

/// 計算各分類佔投資組合現值的百分比
///
/// 每檔持股的現值優先使用即時價格，查無報價時退回取得成本。
/// 分類依首次出現順序排列；投資組合總值為零時回傳空結果，
/// 缺漏的報價是常態而非錯誤。
pub fn current_composition(
    holdings: &[HoldingSnapshot],
    live_prices: &HashMap<i64, f64>,
) -> Vec<CategoryWeight> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for holding in holdings {
        let price = live_prices
            .get(&holding.stock_id)
            .copied()
            .unwrap_or(holding.acquisition_price);
        let value = price * holding.quantity as f64;

        match index.get(&holding.category) {
            Some(&i) => totals[i].1 += value,
            None => {
                index.insert(holding.category.clone(), totals.len());
                totals.push((holding.category.clone(), value));
            }
        }
    }

    let portfolio_total: f64 = totals.iter().map(|(_, v)| v).sum();
    if portfolio_total == 0.0 {
        return Vec::new();
    }

    totals
        .into_iter()
        .map(|(category, value)| CategoryWeight {
            category,
            percentage: value / portfolio_total * 100.0,
        })
        .collect()
}

/// 合併現況與目標配置為比較檢視
///
/// 取兩邊分類的聯集：只有目標沒有持倉的分類現況為 0，
/// 只有持倉沒有目標的分類目標為 0。結果依現況百分比遞減排序，
/// 同值時維持首次出現順序（穩定排序）。
pub fn combined_view(current: &[CategoryWeight], targets: &[TargetWeight]) -> Vec<ComparisonRow> {
    let target_by_category: HashMap<&str, f64> = targets
        .iter()
        .map(|t| (t.category.as_str(), t.percentage))
        .collect();

    let mut rows: Vec<ComparisonRow> = current
        .iter()
        .map(|weight| ComparisonRow {
            category: weight.category.clone(),
            current_percentage: weight.percentage,
            target_percentage: target_by_category
                .get(weight.category.as_str())
                .copied()
                .unwrap_or(0.0),
        })
        .collect();

    for target in targets {
        if !current.iter().any(|w| w.category == target.category) {
            rows.push(ComparisonRow {
                category: target.category.clone(),
                current_percentage: 0.0,
                target_percentage: target.percentage,
            });
        }
    }

    rows.sort_by(|a, b| {
        b.current_percentage
            .partial_cmp(&a.current_percentage)
            .unwrap_or(Ordering::Equal)
    });

    rows
}

/// 四捨五入到小數點後兩位，序列化邊界使用
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
