// 模組定義
pub mod api;
pub mod config;
pub mod domain;
pub mod market_data;
pub mod storage;
