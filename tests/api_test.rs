mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use portfolio_server::api::{api_routes, AppState};
use portfolio_server::market_data::{MarketDataError, Quote, QuoteProvider};

use common::setup_test_db;

/// 固定回覆的報價替身
#[derive(Default)]
struct StubQuotes {
    prices: HashMap<String, f64>,
    names: HashMap<String, String>,
}

#[async_trait]
impl QuoteProvider for StubQuotes {
    async fn quote(&self, ticker: &str) -> Result<Option<Quote>, MarketDataError> {
        Ok(self.prices.get(ticker).map(|&price| Quote {
            current: price,
            previous_close: price,
        }))
    }

    async fn symbol_name(&self, ticker: &str) -> Result<Option<String>, MarketDataError> {
        Ok(self.names.get(ticker).cloned())
    }
}

async fn test_app(quotes: StubQuotes) -> Router {
    let pool = setup_test_db().await;
    api_routes(AppState::new(pool, Arc::new(quotes)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(StubQuotes::default()).await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_strategy_crud_over_http() {
    let app = test_app(StubQuotes::default()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/strategies",
            json!({"name": "Growth", "description": "長期成長"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let parent = json_body(response).await;
    let parent_id = parent["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/strategies",
            json!({"name": "Growth-Tech", "parent_id": parent_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let child = json_body(response).await;
    let child_id = child["id"].as_i64().unwrap();

    // 孫策略違反兩層限制
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/strategies",
            json!({"name": "Too-Deep", "parent_id": child_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // ?parent_id 過濾出子策略
    let response = app
        .clone()
        .oneshot(get_request(&format!("/strategies?parent_id={parent_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Growth-Tech");

    let response = app
        .clone()
        .oneshot(get_request("/strategies/999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stock_create_rejects_orphaned_child() {
    let app = test_app(StubQuotes::default()).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/strategies", json!({"name": "Growth"})))
        .await
        .unwrap();
    let parent_id = json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/strategies",
            json!({"name": "Growth-Tech", "parent_id": parent_id}),
        ))
        .await
        .unwrap();
    let child_id = json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stocks",
            json!({
                "ticker": "AAPL",
                "name": "Apple Inc",
                "quantity": 10,
                "acquisition_price": 150.0,
                "strategy_ids": [child_id]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains(&child_id.to_string()));

    // 父子一併選取則建立成功
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stocks",
            json!({
                "ticker": "AAPL",
                "name": "Apple Inc",
                "quantity": 10,
                "acquisition_price": 150.0,
                "strategy_ids": [parent_id, child_id]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["strategy_ids"], json!([parent_id, child_id]));
}

#[tokio::test]
async fn test_stock_create_merges_existing_ticker() {
    let app = test_app(StubQuotes::default()).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stocks",
            json!({
                "ticker": "7203",
                "name": "トヨタ自動車",
                "quantity": 10,
                "acquisition_price": 1000.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    // 全數字代號歸類為日本株
    assert_eq!(created["category"], "日本株");

    // 同代號再次建立走併入路徑：股數相加、成本加權平均
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stocks",
            json!({
                "ticker": "7203",
                "quantity": 10,
                "acquisition_price": 2000.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let merged = json_body(response).await;
    assert_eq!(merged["quantity"], 20);
    assert_eq!(merged["acquisition_price"], 1500.0);

    let response = app.clone().oneshot(get_request("/stocks")).await.unwrap();
    let listed = json_body(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stock_name_falls_back_to_symbol_lookup() {
    let app = test_app(StubQuotes {
        names: HashMap::from([("MSFT".to_string(), "Microsoft Corp".to_string())]),
        ..Default::default()
    })
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stocks",
            json!({"ticker": "MSFT", "quantity": 5, "acquisition_price": 300.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Microsoft Corp");
    assert_eq!(body["category"], "米国株");
}

#[tokio::test]
async fn test_allocation_endpoints_and_comparison() {
    let app = test_app(StubQuotes {
        prices: HashMap::from([("AAPL".to_string(), 300.0)]),
        ..Default::default()
    })
    .await;

    for (ticker, name, quantity, price, category) in [
        ("7203", "トヨタ自動車", 10, 1000.0, "日本株"),
        ("AAPL", "Apple Inc", 5, 200.0, "米国株"),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/stocks",
                json!({
                    "ticker": ticker,
                    "name": name,
                    "quantity": quantity,
                    "acquisition_price": price,
                    "category": category
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/allocations",
            json!({"category": "日本株", "percentage": 60.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 豐田沒有報價退回成本價：10000 對 1500
    let response = app
        .clone()
        .oneshot(get_request("/allocations/composition"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let composition = json_body(response).await;
    assert_eq!(composition[0]["category"], "日本株");
    assert_eq!(composition[0]["percentage"], 86.96);
    assert_eq!(composition[1]["percentage"], 13.04);

    let response = app
        .clone()
        .oneshot(get_request("/allocations/comparison"))
        .await
        .unwrap();
    let comparison = json_body(response).await;
    assert_eq!(comparison[0]["category"], "日本株");
    assert_eq!(comparison[0]["current_percentage"], 86.96);
    assert_eq!(comparison[0]["target_percentage"], 60.0);
    assert_eq!(comparison[1]["category"], "米国株");
    assert_eq!(comparison[1]["target_percentage"], 0.0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/allocations/%E5%82%B5%E5%88%B8")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().is_some());
}

#[tokio::test]
async fn test_live_prices_endpoint() {
    let app = test_app(StubQuotes {
        prices: HashMap::from([("AAPL".to_string(), 305.5)]),
        ..Default::default()
    })
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/stocks",
            json!({"ticker": "AAPL", "name": "Apple Inc", "quantity": 5, "acquisition_price": 200.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let stock_id = json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/stocks/live-prices"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let prices = json_body(response).await;
    assert_eq!(prices[stock_id.to_string()], 305.5);

    // 單一代號直接回傳報價本體
    let response = app
        .clone()
        .oneshot(get_request("/stocks/live-prices/AAPL"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let quote = json_body(response).await;
    assert_eq!(quote["c"], 305.5);

    let response = app
        .clone()
        .oneshot(get_request("/stocks/live-prices/NVDA"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_unknown_stock_returns_not_found() {
    let app = test_app(StubQuotes::default()).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/strategies", json!({"name": "Growth"})))
        .await
        .unwrap();
    let parent_id = json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/strategies",
            json!({"name": "Growth-Tech", "parent_id": parent_id}),
        ))
        .await
        .unwrap();
    let child_id = json_body(response).await["id"].as_i64().unwrap();

    // 未知持股優先回 404，即使帶入的關聯集合本身也不合法
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/stocks/999",
            json!({
                "ticker": "AAPL",
                "quantity": 10,
                "acquisition_price": 150.0,
                "strategy_ids": [child_id]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("999"));
}
