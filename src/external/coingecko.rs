use serde::Deserialize;

use crate::external::market_data::MarketDataError;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

/// Live market stats for one coin, all USD-denominated.
#[derive(Debug, Clone)]
pub struct CoinMarketStats {
    pub market_cap: f64,
    pub price: f64,
    pub circulating_supply: f64,
    pub daily_volume: f64,
}

pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: MarketData,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    market_cap: UsdQuote,
    current_price: UsdQuote,
    circulating_supply: Option<f64>,
    total_volume: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    usd: Option<f64>,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("COINGECKO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub async fn fetch_coin_stats(&self, coin_id: &str) -> Result<CoinMarketStats, MarketDataError> {
        let url = format!("{}/api/v3/coins/{}", self.base_url, coin_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(MarketDataError::RateLimited);
        }
        if status.as_u16() == 404 {
            return Err(MarketDataError::NoData(coin_id.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketDataError::BadResponse(format!("{status}: {body}")));
        }

        let body = resp
            .json::<CoinResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(CoinMarketStats {
            market_cap: body.market_data.market_cap.usd.unwrap_or(0.0),
            price: body.market_data.current_price.usd.unwrap_or(0.0),
            circulating_supply: body.market_data.circulating_supply.unwrap_or(0.0),
            daily_volume: body.market_data.total_volume.usd.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_response_deserializes_usd_quotes() {
        let payload = r#"{
            "market_data": {
                "market_cap": {"usd": 1000000.0},
                "current_price": {"usd": 2.5},
                "circulating_supply": 400000.0,
                "total_volume": {"usd": 50000.0}
            }
        }"#;

        let body: CoinResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(body.market_data.market_cap.usd, Some(1_000_000.0));
        assert_eq!(body.market_data.current_price.usd, Some(2.5));
        assert_eq!(body.market_data.circulating_supply, Some(400_000.0));
    }

    #[test]
    fn missing_usd_quote_maps_to_none() {
        let payload = r#"{
            "market_data": {
                "market_cap": {},
                "current_price": {"usd": 1.0},
                "total_volume": {"usd": 10.0}
            }
        }"#;

        let body: CoinResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(body.market_data.market_cap.usd, None);
        assert_eq!(body.market_data.circulating_supply, None);
    }
}
