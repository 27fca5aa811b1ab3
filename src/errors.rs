use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::external::market_data::MarketDataError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("start date must be before end date")]
    InvalidRange,
    #[error("no weight configured for symbol {0}")]
    MissingWeight(String),
    #[error("unsupported rebalance period: {0}")]
    UnsupportedGranularity(String),
    #[error("failed to fetch market data for {symbol}: {source}")]
    ProviderFetch {
        symbol: String,
        #[source]
        source: MarketDataError,
    },
    #[error("no price data in range for {0}")]
    EmptySeries(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited by external provider")]
    RateLimited,
    #[error("external error: {0}")]
    External(String),
}

impl AppError {
    /// Wrap a provider failure for `symbol`, keeping the rate-limit signal
    /// distinct so the HTTP layer can answer 429.
    pub fn from_provider(symbol: &str, source: MarketDataError) -> Self {
        match source {
            MarketDataError::RateLimited => AppError::RateLimited,
            source => AppError::ProviderFetch {
                symbol: symbol.to_string(),
                source,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::InvalidRange
            | AppError::MissingWeight(_)
            | AppError::UnsupportedGranularity(_)
            | AppError::EmptySeries(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::ProviderFetch { .. } | AppError::External(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        if matches!(self, AppError::RateLimited) {
            let mut headers = HeaderMap::new();
            headers.insert("Retry-After", HeaderValue::from_static("60"));
            return (status, headers, body).into_response();
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_rate_limit_surfaces_as_rate_limited() {
        let err = AppError::from_provider("BTC/USDT", MarketDataError::RateLimited);
        assert!(matches!(err, AppError::RateLimited));
    }

    #[test]
    fn provider_failure_names_the_symbol() {
        let err = AppError::from_provider(
            "ETH/USDT",
            MarketDataError::Network("connection refused".into()),
        );
        assert_eq!(
            err.to_string(),
            "failed to fetch market data for ETH/USDT: network error: connection refused"
        );
    }
}
