use serde::{Deserialize, Serialize};

/// Chain stats the caller supplies because no free API exposes them,
/// all denominated in the coin's own unit.
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationRequest {
    #[serde(default)]
    pub burn_daily: f64,
    #[serde(default)]
    pub fees_daily: f64,
    #[serde(default)]
    pub active_wallets: f64,
    /// Annual inflation rate in percent.
    #[serde(default)]
    pub inflation: f64,
    /// Daily on-chain transaction volume; falls back to exchange volume
    /// when zero.
    #[serde(default)]
    pub transaction_volume: f64,
}

/// Display-formatted valuation bundle, mirroring what the dashboard
/// renders verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct CoinValuation {
    pub market_cap: String,
    pub price: String,
    pub burn_daily: String,
    pub fees_daily: String,
    pub active_wallets: String,
    pub tvl: String,
    pub inflation: String,
    /// Network-value-to-transactions ratio; absent when no volume exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nvt: Option<f64>,
    pub fair_price_range: String,
}
