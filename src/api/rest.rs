// src/api/rest.rs
use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::info;

use crate::api::routes::api_routes;
use crate::api::state::AppState;
use crate::config::ServerConfig;

/// REST API 伺服器
pub struct RestApi {
    server_config: ServerConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(server_config: ServerConfig, state: AppState) -> Self {
        Self {
            server_config,
            state,
        }
    }

    pub async fn start(self) -> Result<()> {
        // 解析地址
        let addr = SocketAddr::from((
            self.server_config.host.parse::<std::net::IpAddr>()?,
            self.server_config.port,
        ));

        // 建立應用
        let app = self.build_app();

        info!("Starting REST API server on {}", addr);

        // 啟動服務器
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    fn build_app(&self) -> Router {
        // 建立應用並逐層添加中間件
        api_routes(self.state.clone())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            // CORS
            .layer(self.build_cors_layer())
            // 超時設置
            .layer(TimeoutLayer::new(self.server_config.request_timeout()))
    }

    fn build_cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods(vec![
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
            ])
            .allow_headers(vec![axum::http::header::CONTENT_TYPE]);

        // 根據配置設置允許的來源
        if self.server_config.cors_allow_all {
            cors.allow_origin(tower_http::cors::Any)
        } else {
            cors.allow_origin(
                self.server_config
                    .cors_origins
                    .iter()
                    .filter_map(|s| s.parse().ok())
                    .collect::<Vec<_>>(),
            )
        }
    }
}

/// 等待關閉信號
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("接收到關閉信號，正在退出..."),
        Err(err) => tracing::error!("無法監聽關閉信號: {}", err),
    }
}
