pub mod backtest_service;
pub mod calendar;
pub mod market_service;
pub mod metrics;
pub mod monte_carlo_service;
pub mod probability_service;
pub mod valuation_service;
