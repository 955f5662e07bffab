use axum::{
    routing::get,
    Router,
};

use crate::api::handlers::strategies;
use crate::api::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/strategies", get(strategies::list).post(strategies::create))
        .route(
            "/strategies/{id}",
            get(strategies::get)
                .put(strategies::update)
                .delete(strategies::remove),
        )
}
