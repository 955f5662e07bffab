use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use portfolio_server::api::{AppState, RestApi};
use portfolio_server::config;
use portfolio_server::market_data::FinnhubClient;
use portfolio_server::storage::{database, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化配置
    let app_config = config::init_config()?;

    // 初始化日誌系統
    init_logging(&app_config.log)?;

    // 初始化資料庫連線池並執行遷移
    let pool = database::init_pool(&app_config.database).await?;
    run_migrations(&pool).await?;

    // 行情客戶端
    let quotes = Arc::new(FinnhubClient::new(&app_config.market_data)?);
    if app_config.market_data.api_key.trim().is_empty() {
        info!("未設定行情 API 金鑰，配置計算將以取得成本估值");
    }

    // 初始化REST API
    let state = AppState::new(pool, quotes);
    let rest_api = RestApi::new(app_config.server.clone(), state);
    rest_api.start().await
}

// 初始化日誌系統
fn init_logging(log_config: &config::LogConfig) -> Result<()> {
    let level = match log_config.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // 默認為INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!("日誌系統初始化完成");
    Ok(())
}
