use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::storage::models::strategy::StrategyInsert;

/// 策略創建/更新請求
#[derive(Debug, Deserialize)]
pub struct StrategyPayload {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

impl StrategyPayload {
    fn to_insert(&self) -> StrategyInsert {
        StrategyInsert {
            name: self.name.clone(),
            description: self.description.clone(),
            parent_id: self.parent_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StrategiesQuery {
    pub parent_id: Option<i64>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<StrategyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let strategy = state.strategies.create(&payload.to_insert()).await?;
    Ok((StatusCode::CREATED, Json(strategy)))
}

/// 列出所有策略；帶 `parent_id` 時只回傳該策略的子策略
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<StrategiesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let strategies = match query.parent_id {
        Some(parent_id) => state.strategies.children_of(parent_id).await?,
        None => state.strategies.list_all().await?,
    };
    Ok(Json(strategies))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let strategy = state
        .strategies
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("策略不存在: ID {id}")))?;
    Ok(Json(strategy))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StrategyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let strategy = state.strategies.update(id, &payload.to_insert()).await?;
    Ok(Json(strategy))
}

/// 刪除策略並回傳被刪除的內容
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let strategy = state
        .strategies
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("策略不存在: ID {id}")))?;
    state.strategies.delete(id).await?;
    Ok(Json(strategy))
}
