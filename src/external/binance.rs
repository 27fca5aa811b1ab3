use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::external::market_data::{Candle, MarketDataError, MarketDataProvider};
use crate::models::Granularity;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Kline limit per request. Matches what the spot API allows and what the
/// daily/weekly/monthly granularities realistically need for a backtest
/// window of a few years.
const KLINE_LIMIT: u32 = 1000;

pub struct BinanceProvider {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("BINANCE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }
}

/// Spot klines come back as positional 12-element arrays: open time (ms),
/// then OHLCV with prices encoded as strings, close time, quote volume,
/// trade count, taker volumes and an ignored field.
type KlineRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    i64,
    String,
    String,
    String,
);

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<MarketEntry>,
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    status: String,
    #[serde(rename = "baseAsset")]
    base_asset: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
}

fn interval(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Day => "1d",
        Granularity::Week => "1w",
        Granularity::Month => "1M",
    }
}

/// Binance wants `BTCUSDT`; callers use the `BTC/USDT` market notation.
fn exchange_symbol(symbol: &str) -> String {
    symbol.replace('/', "")
}

fn parse_price(raw: &str) -> Result<f64, MarketDataError> {
    raw.parse::<f64>()
        .map_err(|e| MarketDataError::Parse(e.to_string()))
}

fn kline_to_candle(row: &KlineRow) -> Result<Candle, MarketDataError> {
    let date = DateTime::from_timestamp_millis(row.0)
        .ok_or_else(|| MarketDataError::Parse(format!("invalid kline timestamp {}", row.0)))?
        .date_naive();

    Ok(Candle {
        date,
        open: parse_price(&row.1)?,
        high: parse_price(&row.2)?,
        low: parse_price(&row.3)?,
        close: parse_price(&row.4)?,
        volume: parse_price(&row.5)?,
    })
}

/// Convert raw kline rows into ascending, date-deduplicated candles inside
/// `[start, end]`. Later rows win on duplicate dates (the exchange emits at
/// most one finished candle per date, but the in-progress candle can share
/// a date with the last finished one).
fn collect_candles(
    rows: &[KlineRow],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Candle>, MarketDataError> {
    let mut out: Vec<Candle> = Vec::with_capacity(rows.len());
    for row in rows {
        let candle = kline_to_candle(row)?;
        if candle.date < start || candle.date > end {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.date == candle.date => *last = candle,
            _ => out.push(candle),
        }
    }
    Ok(out)
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let since_ms = start
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();

        let url = format!("{}/api/v3/klines", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", exchange_symbol(symbol).as_str()),
                ("interval", interval(granularity)),
                ("startTime", since_ms.to_string().as_str()),
                ("limit", KLINE_LIMIT.to_string().as_str()),
            ])
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.as_u16() == 418 {
            return Err(MarketDataError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketDataError::BadResponse(format!("{status}: {body}")));
        }

        let rows = resp
            .json::<Vec<KlineRow>>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        if rows.is_empty() {
            return Err(MarketDataError::NoData(symbol.to_string()));
        }

        collect_candles(&rows, start, end)
    }

    async fn list_markets(&self, quote: Option<&str>) -> Result<Vec<String>, MarketDataError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.as_u16() == 418 {
            return Err(MarketDataError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketDataError::BadResponse(format!("{status}: {body}")));
        }

        let info = resp
            .json::<ExchangeInfo>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        let tickers = info
            .symbols
            .iter()
            .filter(|m| m.status == "TRADING")
            .filter(|m| quote.map_or(true, |q| m.quote_asset == q))
            .map(|m| format!("{}/{}", m.base_asset, m.quote_asset))
            .collect();

        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn interval_maps_to_binance_codes() {
        assert_eq!(interval(Granularity::Day), "1d");
        assert_eq!(interval(Granularity::Week), "1w");
        assert_eq!(interval(Granularity::Month), "1M");
    }

    #[test]
    fn exchange_symbol_strips_market_separator() {
        assert_eq!(exchange_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(exchange_symbol("BTCUSDT"), "BTCUSDT");
    }

    #[test]
    fn kline_rows_deserialize_from_spot_payload() {
        // Trimmed /api/v3/klines payload: two daily candles.
        let payload = r#"[
            [1704067200000, "40000", "40500", "39800", "40300", "1000",
             1704153599999, "0", 0, "0", "0", "0"],
            [1704153600000, "40300", "41000", "40000", "40700", "1200",
             1704239999999, "0", 0, "0", "0", "0"]
        ]"#;

        let rows: Vec<KlineRow> = serde_json::from_str(payload).unwrap();
        let candles = collect_candles(&rows, date("2024-01-01"), date("2024-01-31")).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].date, date("2024-01-01"));
        assert_eq!(candles[0].close, 40300.0);
        assert_eq!(candles[1].close, 40700.0);
    }

    #[test]
    fn collect_candles_filters_range_and_dedupes_dates() {
        let payload = r#"[
            [1704067200000, "1", "1", "1", "100", "10",
             0, "0", 0, "0", "0", "0"],
            [1704110400000, "1", "1", "1", "101", "10",
             0, "0", 0, "0", "0", "0"],
            [1706745600000, "1", "1", "1", "200", "10",
             0, "0", 0, "0", "0", "0"]
        ]"#;

        let rows: Vec<KlineRow> = serde_json::from_str(payload).unwrap();
        // Second row falls on the same date as the first; third is outside
        // the range.
        let candles = collect_candles(&rows, date("2024-01-01"), date("2024-01-15")).unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 101.0);
    }
}
