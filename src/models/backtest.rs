use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Sampling interval of the fetched series and, at the same time, the
/// rebalancing period of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Accepts the period codes the original clients send: ccxt-style
    /// timeframes ("1d", "1w", "1M") and the pandas-style aliases
    /// ("D", "W", "M", "ME"). Case matters — "1m" would mean minutes.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "1d" | "D" => Some(Granularity::Day),
            "1w" | "W" => Some(Granularity::Week),
            "1M" | "M" | "ME" => Some(Granularity::Month),
            _ => None,
        }
    }
}

fn default_rebalance_period() -> String {
    "1M".to_string()
}

fn default_rebalance() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioBacktestRequest {
    /// Symbol -> target weight. The key set is also the symbol universe.
    pub assets: BTreeMap<String, f64>,
    pub initial_balance: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_rebalance_period")]
    pub rebalance_period: String,
    #[serde(default = "default_rebalance")]
    pub rebalance: bool,
    #[serde(default)]
    pub fee_rate: f64,
    #[serde(default)]
    pub slippage: f64,
}

impl PortfolioBacktestRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.assets.is_empty() {
            return Err(AppError::Validation("assets must not be empty".into()));
        }
        if self.initial_balance <= 0.0 {
            return Err(AppError::Validation(
                "initial_balance must be greater than zero".into(),
            ));
        }
        if self.fee_rate < 0.0 || self.slippage < 0.0 {
            return Err(AppError::Validation(
                "fee_rate and slippage must not be negative".into(),
            ));
        }

        let total: f64 = self.assets.values().sum();
        if (total - 1.0).abs() > 0.01 {
            return Err(AppError::Validation(format!(
                "asset weights must sum to 1.0, got {total:.4}"
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub roi: f64,
    pub mdd: f64,
    pub cagr: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    pub monthly_returns: BTreeMap<String, f64>,
    /// Symbols dropped from the simulation because the provider had no
    /// usable data for them. Their weight still counted toward the
    /// weight-sum check, so the allocated total understates
    /// `initial_balance` when this is non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_symbols: Vec<String>,
    pub portfolio_value_history: BTreeMap<NaiveDate, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(assets: &[(&str, f64)]) -> PortfolioBacktestRequest {
        PortfolioBacktestRequest {
            assets: assets
                .iter()
                .map(|(s, w)| (s.to_string(), *w))
                .collect(),
            initial_balance: 10_000.0,
            start_date: "2024-01-01".parse().unwrap(),
            end_date: "2024-06-01".parse().unwrap(),
            rebalance_period: "1M".into(),
            rebalance: true,
            fee_rate: 0.001,
            slippage: 0.0005,
        }
    }

    #[test]
    fn parse_accepts_known_period_codes() {
        assert_eq!(Granularity::parse("1d"), Some(Granularity::Day));
        assert_eq!(Granularity::parse("D"), Some(Granularity::Day));
        assert_eq!(Granularity::parse("1w"), Some(Granularity::Week));
        assert_eq!(Granularity::parse("W"), Some(Granularity::Week));
        assert_eq!(Granularity::parse("1M"), Some(Granularity::Month));
        assert_eq!(Granularity::parse("ME"), Some(Granularity::Month));
    }

    #[test]
    fn parse_rejects_minutes_and_unknown_codes() {
        assert_eq!(Granularity::parse("1m"), None);
        assert_eq!(Granularity::parse("10W"), None);
        assert_eq!(Granularity::parse(""), None);
    }

    #[test]
    fn weights_must_sum_to_one_within_tolerance() {
        assert!(request(&[("BTC/USDT", 0.6), ("ETH/USDT", 0.4)]).validate().is_ok());
        assert!(request(&[("BTC/USDT", 0.6), ("ETH/USDT", 0.405)]).validate().is_ok());
        assert!(request(&[("BTC/USDT", 1.2)]).validate().is_err());
        assert!(request(&[("BTC/USDT", 0.5)]).validate().is_err());
    }

    #[test]
    fn rejects_empty_assets_and_nonpositive_balance() {
        assert!(request(&[]).validate().is_err());

        let mut req = request(&[("BTC/USDT", 1.0)]);
        req.initial_balance = 0.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_negative_costs() {
        let mut req = request(&[("BTC/USDT", 1.0)]);
        req.fee_rate = -0.001;
        assert!(req.validate().is_err());
    }
}
