/// Runtime settings, all environment-driven with sensible defaults so a
/// bare `cargo run` serves against the public APIs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub port: u16,
    /// Blanket per-request timeout enforced at the middleware layer.
    pub request_timeout_secs: u64,
    pub binance_base_url: String,
    pub coingecko_base_url: String,
    pub defillama_base_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "backtest-api".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(60),
            binance_base_url: std::env::var("BINANCE_BASE_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            coingecko_base_url: std::env::var("COINGECKO_BASE_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com".to_string()),
            defillama_base_url: std::env::var("DEFILLAMA_BASE_URL")
                .unwrap_or_else(|_| "https://api.llama.fi".to_string()),
        }
    }
}
