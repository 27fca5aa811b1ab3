mod app;
mod config;
mod errors;
mod external;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::Settings;
use crate::external::binance::BinanceProvider;
use crate::external::coingecko::CoinGeckoClient;
use crate::external::defillama::DefiLlamaClient;
use crate::external::market_data::MarketDataProvider;
use crate::logging::LoggingConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let settings = Settings::from_env();
    tracing::info!("📊 Market data provider: Binance ({})", settings.binance_base_url);

    let market_data: Arc<dyn MarketDataProvider> =
        Arc::new(BinanceProvider::new(settings.binance_base_url.clone()));

    let state = AppState {
        market_data,
        coingecko: Arc::new(CoinGeckoClient::new(settings.coingecko_base_url.clone())),
        defillama: Arc::new(DefiLlamaClient::new(settings.defillama_base_url.clone())),
    };

    let app = app::create_app(state, Duration::from_secs(settings.request_timeout_secs));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 {} running at http://{}/", settings.app_name, addr);
    axum::serve(listener, app).await?;

    Ok(())
}
