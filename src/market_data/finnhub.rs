use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::MarketDataConfig;
use crate::market_data::{MarketDataError, Quote, QuoteProvider};

/// Finnhub 行情客戶端
///
/// 未設定 API 金鑰時所有查詢直接回傳 None，伺服器仍可運作，
/// 只是配置計算全數退回取得成本。
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    /// 依配置建立客戶端
    pub fn new(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Finnhub symbol search 回應
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    symbol: Option<String>,
    #[serde(rename = "displaySymbol")]
    display_symbol: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    security_type: Option<String>,
}

impl SearchItem {
    fn matches(&self, ticker: &str) -> bool {
        self.symbol.as_deref() == Some(ticker) || self.display_symbol.as_deref() == Some(ticker)
    }

    fn is_common_stock(&self) -> bool {
        self.security_type.as_deref() == Some("Common Stock")
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn quote(&self, ticker: &str) -> Result<Option<Quote>, MarketDataError> {
        if !self.has_api_key() {
            debug!("未設定行情 API 金鑰，略過 {} 的報價查詢", ticker);
            return Ok(None);
        }

        let quote: Quote = self
            .http
            .get(format!("{}/quote", self.base_url))
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if quote.effective_price().is_some() {
            Ok(Some(quote))
        } else {
            Ok(None)
        }
    }

    async fn symbol_name(&self, ticker: &str) -> Result<Option<String>, MarketDataError> {
        if !self.has_api_key() {
            return Ok(None);
        }

        let response: SearchResponse = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", ticker), ("token", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // 代號完全一致的項目優先，其次是第一個普通股，最後退回第一筆
        let name = response
            .result
            .iter()
            .find(|item| item.matches(ticker))
            .or_else(|| response.result.iter().find(|item| item.is_common_stock()))
            .or_else(|| response.result.first())
            .and_then(|item| item.description.clone());

        Ok(name)
    }
}
