use serde::Deserialize;

use crate::external::market_data::MarketDataError;

const DEFAULT_BASE_URL: &str = "https://api.llama.fi";

pub struct DefiLlamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Protocol {
    chain: Option<String>,
    tvl: Option<f64>,
}

impl DefiLlamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("DEFILLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Total value locked for the chain matching `coin_id`, case-insensitive.
    /// Unknown chains report 0 rather than failing the valuation.
    pub async fn fetch_tvl(&self, coin_id: &str) -> Result<f64, MarketDataError> {
        let url = format!("{}/protocols", self.base_url);
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
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketDataError::BadResponse(format!("{status}: {body}")));
        }

        let protocols = resp
            .json::<Vec<Protocol>>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(match_tvl(&protocols, coin_id))
    }
}

fn match_tvl(protocols: &[Protocol], coin_id: &str) -> f64 {
    protocols
        .iter()
        .find(|p| {
            p.chain
                .as_deref()
                .map_or(false, |chain| chain.eq_ignore_ascii_case(coin_id))
        })
        .and_then(|p| p.tvl)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_tvl_is_case_insensitive() {
        let protocols = vec![
            Protocol {
                chain: Some("Ethereum".into()),
                tvl: Some(123.0),
            },
            Protocol {
                chain: Some("Mantle".into()),
                tvl: Some(456.0),
            },
        ];

        assert_eq!(match_tvl(&protocols, "mantle"), 456.0);
    }

    #[test]
    fn match_tvl_defaults_to_zero_for_unknown_chain() {
        let protocols = vec![Protocol {
            chain: Some("Ethereum".into()),
            tvl: Some(123.0),
        }];

        assert_eq!(match_tvl(&protocols, "unknown-chain"), 0.0);
        assert_eq!(match_tvl(&[], "ethereum"), 0.0);
    }
}
