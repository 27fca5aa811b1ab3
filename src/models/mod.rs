mod backtest;
mod monte_carlo;
mod probability;
mod response;
mod valuation;

pub use backtest::{BacktestSummary, Granularity, PortfolioBacktestRequest};
pub use monte_carlo::{MonteCarloRequest, MonteCarloResult};
pub use probability::{ProbabilityRequest, ProbabilityResult};
pub use response::ApiResponse;
pub use valuation::{CoinValuation, ValuationRequest};
