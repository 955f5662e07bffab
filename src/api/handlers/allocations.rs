use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::domain::{
    combined_view, current_composition, round2, CategoryWeight, ComparisonRow, HoldingSnapshot,
    TargetWeight,
};
use crate::market_data;
use crate::storage::models::allocation::TargetAllocation;

/// 寫入或更新目標配置
pub async fn upsert(
    State(state): State<AppState>,
    Json(payload): Json<TargetAllocation>,
) -> Result<impl IntoResponse, ApiError> {
    let allocation = state.allocations.upsert(&payload).await?;
    Ok(Json(allocation))
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let allocations = state.allocations.list_all().await?;
    Ok(Json(allocations))
}

/// 刪除目標配置並回傳被刪除的內容
pub async fn remove(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let allocation = state
        .allocations
        .get_by_category(&category)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("目標配置不存在: {category}")))?;
    state.allocations.delete(&category).await?;
    Ok(Json(allocation))
}

/// 取得持倉與即時價格，組出配置計算的輸入
async fn load_current(state: &AppState) -> Result<Vec<CategoryWeight>, ApiError> {
    let stocks = state.stocks.list_all().await?;

    let tickers: Vec<(i64, String)> = stocks
        .iter()
        .map(|s| (s.stock.id, s.stock.ticker.clone()))
        .collect();
    let prices: HashMap<i64, f64> = market_data::live_prices(state.quotes.as_ref(), &tickers).await;

    let holdings: Vec<HoldingSnapshot> =
        stocks.iter().map(|s| s.stock.holding_snapshot()).collect();
    Ok(current_composition(&holdings, &prices))
}

/// 各分類佔投資組合現值的百分比
pub async fn composition(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let current = load_current(&state)
        .await?
        .into_iter()
        .map(|weight| CategoryWeight {
            percentage: round2(weight.percentage),
            ..weight
        })
        .collect::<Vec<_>>();
    Ok(Json(current))
}

/// 現況與目標的比較檢視，依現況百分比遞減排序
///
/// 伺服器是唯一的計算來源，呼叫端只負責呈現這些列。
pub async fn comparison(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let current = load_current(&state).await?;

    let targets: Vec<TargetWeight> = state
        .allocations
        .list_all()
        .await?
        .iter()
        .map(TargetAllocation::to_weight)
        .collect();

    let rows = combined_view(&current, &targets)
        .into_iter()
        .map(|row| ComparisonRow {
            current_percentage: round2(row.current_percentage),
            target_percentage: round2(row.target_percentage),
            ..row
        })
        .collect::<Vec<_>>();

    Ok(Json(rows))
}
