// api.rs - API服務模組，宣告子模組
//
// API服務模組提供外部接口，使用戶能夠與系統交互，實現：
// - RESTful API接口
// - API路由和處理器
// - 領域錯誤到 HTTP 回應的轉換

/// API 錯誤轉換
pub mod error;
/// API處理器模組
pub mod handlers;
/// REST API實現
pub mod rest;
/// API路由定義
pub mod routes;
/// 共享應用狀態
pub mod state;

pub use error::ApiError;
pub use rest::RestApi;
pub use routes::api_routes;
pub use state::AppState;
