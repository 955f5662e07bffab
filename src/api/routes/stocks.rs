use axum::{
    routing::get,
    Router,
};

use crate::api::handlers::stocks;
use crate::api::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stocks", get(stocks::list).post(stocks::create))
        .route("/stocks/live-prices", get(stocks::live_prices))
        .route("/stocks/live-prices/{ticker}", get(stocks::live_price))
        .route(
            "/stocks/{id}",
            get(stocks::get).put(stocks::update).delete(stocks::remove),
        )
}
