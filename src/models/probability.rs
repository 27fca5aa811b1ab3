use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct ProbabilityRequest {
    pub symbol: String,
    pub timeframe: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    /// Annualized target return the probability is computed against,
    /// e.g. 0.05 for 5%.
    pub target_return: f64,
}

impl ProbabilityRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.initial_balance <= 0.0 {
            return Err(AppError::Validation(
                "initial_balance must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityResult {
    pub symbol: String,
    pub timeframe: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    pub expected_return: f64,
    pub standard_deviation: f64,
    pub target_return: f64,
    pub z_score: f64,
    pub probability: f64,
    pub daily_returns: Vec<f64>,
    pub value_history: BTreeMap<NaiveDate, f64>,
}
