use axum::Router;

use crate::api::state::AppState;

pub mod allocations;
pub mod stocks;
pub mod strategies;
pub mod system;

/// 組合所有 API 路由
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .merge(stocks::routes())
        .merge(strategies::routes())
        .merge(allocations::routes())
        .merge(system::routes())
        .with_state(state)
}
