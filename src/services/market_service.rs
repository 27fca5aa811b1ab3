use chrono::NaiveDate;
use tracing::info;

use crate::errors::AppError;
use crate::external::market_data::{Candle, MarketDataError, MarketDataProvider};
use crate::models::Granularity;

/// Tradable markets as `BASE/QUOTE` pairs, optionally restricted to one
/// quote currency (e.g. `USDT`).
pub async fn list_tickers(
    provider: &dyn MarketDataProvider,
    quote: Option<&str>,
) -> Result<Vec<String>, AppError> {
    let tickers = provider.list_markets(quote).await.map_err(|e| match e {
        MarketDataError::RateLimited => AppError::RateLimited,
        other => AppError::External(other.to_string()),
    })?;

    info!(
        "Listed {} markets{}",
        tickers.len(),
        quote.map(|q| format!(" quoted in {q}")).unwrap_or_default()
    );
    Ok(tickers)
}

/// History for exactly one symbol, where having no data is an error
/// rather than a silent skip. The single-asset endpoints go through this.
pub async fn fetch_single_series(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    granularity: Granularity,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Candle>, AppError> {
    let candles = provider
        .fetch_ohlcv(symbol, granularity, start, end)
        .await
        .map_err(|e| match e {
            MarketDataError::NoData(symbol) => AppError::EmptySeries(symbol),
            other => AppError::from_provider(symbol, other),
        })?;

    if candles.is_empty() {
        return Err(AppError::EmptySeries(symbol.to_string()));
    }
    Ok(candles)
}
