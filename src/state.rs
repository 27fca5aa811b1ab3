use std::sync::Arc;

use crate::external::coingecko::CoinGeckoClient;
use crate::external::defillama::DefiLlamaClient;
use crate::external::market_data::MarketDataProvider;

#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataProvider>,
    pub coingecko: Arc<CoinGeckoClient>,
    pub defillama: Arc<DefiLlamaClient>,
}
