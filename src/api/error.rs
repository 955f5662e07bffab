use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domain::HierarchyError;
use crate::market_data::MarketDataError;
use crate::storage::repository::{AllocationError, StockError, StrategyError};

/// API 層統一錯誤
///
/// 回應主體固定為 `{"detail": "..."}`，訊息帶出具體違反的規則與
/// 相關 id，呼叫端可以直接呈現。
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<HierarchyError> for ApiError {
    fn from(e: HierarchyError) -> Self {
        match e {
            HierarchyError::UnknownStrategy(_) => ApiError::not_found(e.to_string()),
            HierarchyError::MissingParent { .. } => ApiError::bad_request(e.to_string()),
        }
    }
}

impl From<StrategyError> for ApiError {
    fn from(e: StrategyError) -> Self {
        match &e {
            StrategyError::NotFound(_) => ApiError::not_found(e.to_string()),
            StrategyError::DuplicateName(_)
            | StrategyError::InvalidHierarchy { .. }
            | StrategyError::InUse { .. }
            | StrategyError::HasChildren { .. } => ApiError::bad_request(e.to_string()),
            StrategyError::Database(_) | StrategyError::Tree(_) => {
                error!("策略操作失敗: {}", e);
                ApiError::internal("內部錯誤")
            }
        }
    }
}

impl From<StockError> for ApiError {
    fn from(e: StockError) -> Self {
        match &e {
            StockError::NotFound(_) => ApiError::not_found(e.to_string()),
            StockError::Hierarchy(hierarchy) => hierarchy.clone().into(),
            StockError::TickerConflict(_) => ApiError::bad_request(e.to_string()),
            StockError::Database(_) | StockError::Tree(_) => {
                error!("持股操作失敗: {}", e);
                ApiError::internal("內部錯誤")
            }
        }
    }
}

impl From<MarketDataError> for ApiError {
    fn from(e: MarketDataError) -> Self {
        error!("行情請求失敗: {}", e);
        ApiError::internal("內部錯誤")
    }
}

impl From<AllocationError> for ApiError {
    fn from(e: AllocationError) -> Self {
        match &e {
            AllocationError::NotFound(_) => ApiError::not_found(e.to_string()),
            AllocationError::Database(_) => {
                error!("目標配置操作失敗: {}", e);
                ApiError::internal("內部錯誤")
            }
        }
    }
}
