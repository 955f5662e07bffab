use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::domain::validate_associations;
use crate::market_data;
use crate::storage::models::stock::{StockComplete, StockInsert, DEFAULT_CATEGORY};

/// 查無名稱時的預設顯示名
const UNKNOWN_NAME: &str = "不明な銘柄";

/// 持股創建/更新請求，關聯集合一律全量帶入
#[derive(Debug, Deserialize)]
pub struct StockPayload {
    pub ticker: String,
    pub name: Option<String>,
    pub quantity: i64,
    pub acquisition_price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub strategy_ids: Vec<i64>,
}

/// 關聯集合的早期回饋驗證
///
/// 真正的守門在倉儲交易內；這裡先以當下的策略樹擋掉明顯違規的
/// 請求，讓呼叫端立即拿到具體的違規訊息。
async fn early_validate(state: &AppState, strategy_ids: &[i64]) -> Result<(), ApiError> {
    let tree = state.strategies.load_tree().await?;
    validate_associations(&tree, strategy_ids)?;
    Ok(())
}

/// 代號全為數字視為日本株，否則視為米国株
fn category_from_ticker(ticker: &str) -> &'static str {
    if !ticker.is_empty() && ticker.chars().all(|c| c.is_ascii_digit()) {
        "日本株"
    } else {
        "米国株"
    }
}

/// 創建持股；代號已存在時併入既有部位
///
/// 既有部位的併入採加權平均成本：股數相加，取得單價以新舊兩批
/// 部位的市值加權。分類與關聯集合維持既有設定不變。
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<StockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    early_validate(&state, &payload.strategy_ids).await?;

    if let Some(existing) = state.stocks.get_by_ticker(&payload.ticker).await? {
        let merged = merge_into_existing(&state, &existing, &payload).await?;
        return Ok((StatusCode::OK, Json(merged)));
    }

    // 名稱未提供時以代號查詢，查不到就用預設顯示名
    let name = match &payload.name {
        Some(name) => Some(name.clone()),
        None => match state.quotes.symbol_name(&payload.ticker).await {
            Ok(found) => Some(found.unwrap_or_else(|| UNKNOWN_NAME.to_string())),
            Err(e) => {
                warn!("查詢 {} 名稱失敗: {}", payload.ticker, e);
                Some(UNKNOWN_NAME.to_string())
            }
        },
    };

    // 未指定分類時依代號推斷
    let category = match payload.category.as_deref() {
        None | Some(DEFAULT_CATEGORY) | Some("") => {
            Some(category_from_ticker(&payload.ticker).to_string())
        }
        Some(category) => Some(category.to_string()),
    };

    let insert = StockInsert {
        ticker: payload.ticker.clone(),
        name,
        quantity: payload.quantity,
        acquisition_price: payload.acquisition_price,
        category,
    };

    let stock = state.stocks.create(&insert, &payload.strategy_ids).await?;
    Ok((StatusCode::CREATED, Json(stock)))
}

async fn merge_into_existing(
    state: &AppState,
    existing: &StockComplete,
    payload: &StockPayload,
) -> Result<StockComplete, ApiError> {
    let total_quantity = existing.stock.quantity + payload.quantity;
    if total_quantity == 0 {
        return Err(ApiError::bad_request("併入後的股數不可為零"));
    }

    let weighted_average = (existing.stock.quantity as f64 * existing.stock.acquisition_price
        + payload.quantity as f64 * payload.acquisition_price)
        / total_quantity as f64;

    let insert = StockInsert {
        ticker: existing.stock.ticker.clone(),
        name: existing.stock.name.clone(),
        quantity: total_quantity,
        acquisition_price: weighted_average,
        category: Some(existing.stock.category.clone()),
    };

    let merged = state
        .stocks
        .update(existing.stock.id, &insert, &existing.strategy_ids)
        .await?;
    Ok(merged)
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stocks = state.stocks.list_all().await?;
    Ok(Json(stocks))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let stock = state
        .stocks
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("持股不存在: ID {id}")))?;
    Ok(Json(stock))
}

/// 全量更新持股，含關聯集合的原子替換
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // 未知 id 一律回 404，不先回報關聯集合的驗證錯誤
    if state.stocks.get_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(format!("持股不存在: ID {id}")));
    }

    early_validate(&state, &payload.strategy_ids).await?;

    let insert = StockInsert {
        ticker: payload.ticker.clone(),
        name: payload.name.clone(),
        quantity: payload.quantity,
        acquisition_price: payload.acquisition_price,
        category: payload.category.clone(),
    };

    let stock = state
        .stocks
        .update(id, &insert, &payload.strategy_ids)
        .await?;
    Ok(Json(stock))
}

/// 刪除持股並回傳被刪除的內容
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let stock = state
        .stocks
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("持股不存在: ID {id}")))?;
    state.stocks.delete(id).await?;
    Ok(Json(stock))
}

/// 單一代號的即時報價；查無有效報價時回 404
pub async fn live_price(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state
        .quotes
        .quote(&ticker)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("查無報價: {ticker}")))?;
    Ok(Json(quote))
}

/// 所有持股的即時價格映射
pub async fn live_prices(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stocks = state.stocks.list_all().await?;
    let tickers: Vec<(i64, String)> = stocks
        .iter()
        .map(|s| (s.stock.id, s.stock.ticker.clone()))
        .collect();

    let prices: HashMap<i64, f64> = market_data::live_prices(state.quotes.as_ref(), &tickers).await;
    Ok(Json(prices))
}
