// market_data.rs - 行情模組，宣告子模組
//
// 即時報價與名稱查詢都是盡力而為：查無資料或請求失敗一律降級為
// 「沒有報價」，配置計算會退回取得成本，缺漏是常態而非錯誤。

/// Finnhub 行情客戶端
pub mod finnhub;

pub use finnhub::FinnhubClient;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 行情相關錯誤
#[derive(Debug, thiserror::Error)]
pub enum MarketDataError {
    /// 行情請求失敗
    #[error("行情請求失敗: {0}")]
    Request(#[from] reqwest::Error),
}

/// 即時報價
///
/// 欄位名對應 Finnhub quote 回應：`c` 為現價、`pc` 為前收盤價。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "c")]
    pub current: f64,
    #[serde(rename = "pc")]
    pub previous_close: f64,
}

impl Quote {
    /// 可用的價格：現價優先，收盤後退回前收盤價
    pub fn effective_price(&self) -> Option<f64> {
        if self.current > 0.0 {
            Some(self.current)
        } else if self.previous_close > 0.0 {
            Some(self.previous_close)
        } else {
            None
        }
    }
}

/// 報價提供者特徵
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 取得單一代號的報價；查無有效價格時回傳 None
    async fn quote(&self, ticker: &str) -> Result<Option<Quote>, MarketDataError>;

    /// 以代號查詢標的名稱
    async fn symbol_name(&self, ticker: &str) -> Result<Option<String>, MarketDataError>;
}

/// 併發抓取所有持股的現價
///
/// 回傳 stock_id 對應價格的部分映射，失敗或查無報價的持股直接略過。
pub async fn live_prices(
    provider: &dyn QuoteProvider,
    tickers: &[(i64, String)],
) -> HashMap<i64, f64> {
    let lookups = tickers.iter().map(|(stock_id, ticker)| async move {
        match provider.quote(ticker).await {
            Ok(Some(quote)) => quote.effective_price().map(|price| (*stock_id, price)),
            Ok(None) => None,
            Err(e) => {
                warn!("取得 {} 報價失敗: {}", ticker, e);
                None
            }
        }
    });

    futures::future::join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_price_prefers_current() {
        let quote = Quote {
            current: 123.4,
            previous_close: 120.0,
        };
        assert_eq!(quote.effective_price(), Some(123.4));
    }

    #[test]
    fn test_effective_price_falls_back_to_previous_close() {
        // 收盤後 Finnhub 的現價會是 0
        let quote = Quote {
            current: 0.0,
            previous_close: 120.0,
        };
        assert_eq!(quote.effective_price(), Some(120.0));
    }

    #[test]
    fn test_effective_price_none_when_no_valid_price() {
        assert_eq!(Quote::default().effective_price(), None);
    }
}
