use axum::{
    routing::{delete, get},
    Router,
};

use crate::api::handlers::allocations;
use crate::api::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/allocations",
            get(allocations::list).post(allocations::upsert),
        )
        .route("/allocations/composition", get(allocations::composition))
        .route("/allocations/comparison", get(allocations::comparison))
        .route("/allocations/{category}", delete(allocations::remove))
}
