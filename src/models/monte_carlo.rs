use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

fn default_symbol() -> String {
    "BTC/USDT".to_string()
}

fn default_timeframe() -> String {
    "1d".to_string()
}

fn default_target_return() -> f64 {
    0.10
}

fn default_days() -> u32 {
    30
}

fn default_simulations() -> u32 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonteCarloRequest {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Target expressed as a fractional return over the projection window,
    /// e.g. 0.10 for +10%.
    #[serde(default = "default_target_return")]
    pub target_return: f64,
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_simulations")]
    pub simulations: u32,
}

impl MonteCarloRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.days == 0 {
            return Err(AppError::Validation("days must be greater than zero".into()));
        }
        if self.simulations == 0 {
            return Err(AppError::Validation(
                "simulations must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloResult {
    pub symbol: String,
    pub predicted_price: f64,
    /// Share of simulated paths finishing at or above the target price,
    /// in percent.
    pub probability_above_target: f64,
    pub min_price: f64,
    pub max_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_request_shape() {
        let req: MonteCarloRequest =
            serde_json::from_str(r#"{"start_date": "2024-01-01", "end_date": "2024-06-01"}"#)
                .unwrap();

        assert_eq!(req.symbol, "BTC/USDT");
        assert_eq!(req.timeframe, "1d");
        assert_eq!(req.target_return, 0.10);
        assert_eq!(req.days, 30);
        assert_eq!(req.simulations, 1000);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn zero_days_or_simulations_are_rejected() {
        let mut req: MonteCarloRequest =
            serde_json::from_str(r#"{"start_date": "2024-01-01", "end_date": "2024-06-01"}"#)
                .unwrap();

        req.days = 0;
        assert!(req.validate().is_err());

        req.days = 30;
        req.simulations = 0;
        assert!(req.validate().is_err());
    }
}
