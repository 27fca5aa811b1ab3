use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::Granularity;

/// One OHLCV bar as returned by the exchange, already reduced to a
/// calendar date. The backtest engine only consumes `close`.
#[derive(Debug, Clone)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("no data for {0}")]
    NoData(String),
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the close-price history for one symbol at the given sampling
    /// granularity, filtered to `[start, end]` and strictly ascending by
    /// date. May legitimately return an empty series when the range filter
    /// leaves nothing; returns `NoData` when the exchange has no candles
    /// for the symbol at all.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// List tradable markets as `BASE/QUOTE` pairs, optionally filtered by
    /// quote currency.
    async fn list_markets(&self, quote: Option<&str>) -> Result<Vec<String>, MarketDataError>;
}
