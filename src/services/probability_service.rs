use std::collections::BTreeMap;

use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::info;

use crate::errors::AppError;
use crate::external::market_data::MarketDataProvider;
use crate::models::{Granularity, ProbabilityRequest, ProbabilityResult};
use crate::services::market_service::fetch_single_series;
use crate::services::metrics;

/// Annualization constant shared with the portfolio metrics: daily steps
/// are assumed regardless of the requested timeframe.
const PERIODS_PER_YEAR: f64 = 365.0;

pub async fn calculate_probability(
    provider: &dyn MarketDataProvider,
    request: &ProbabilityRequest,
) -> Result<ProbabilityResult, AppError> {
    if request.start_date >= request.end_date {
        return Err(AppError::InvalidRange);
    }

    let granularity = Granularity::parse(&request.timeframe)
        .ok_or_else(|| AppError::UnsupportedGranularity(request.timeframe.clone()))?;

    let candles = fetch_single_series(
        provider,
        &request.symbol,
        granularity,
        request.start_date,
        request.end_date,
    )
    .await?;

    if candles.len() < 2 {
        return Err(AppError::EmptySeries(request.symbol.clone()));
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let dates: Vec<NaiveDate> = candles.iter().map(|c| c.date).collect();
    let daily_returns = metrics::pct_changes(&closes);

    let (expected_return, standard_deviation, z_score, probability) =
        probability_stats(&daily_returns, request.target_return)?;

    info!(
        "Probability for {}: expected={:.4} std={:.4} z={:.4} p={:.4}",
        request.symbol, expected_return, standard_deviation, z_score, probability
    );

    let value_history = build_value_history(&dates, &daily_returns, request.initial_balance);

    Ok(ProbabilityResult {
        symbol: request.symbol.clone(),
        timeframe: request.timeframe.clone(),
        start_date: request.start_date,
        end_date: request.end_date,
        initial_balance: request.initial_balance,
        expected_return,
        standard_deviation,
        target_return: request.target_return,
        z_score,
        probability,
        daily_returns,
        value_history,
    })
}

/// Annualized mean/std of the return series (population std, like the
/// reference's `np.std`), the Z-score of the target against them, and the
/// upper-tail normal probability.
fn probability_stats(
    returns: &[f64],
    target_return: f64,
) -> Result<(f64, f64, f64, f64), AppError> {
    let expected_return = metrics::mean(returns) * PERIODS_PER_YEAR;
    let standard_deviation = metrics::population_std(returns) * PERIODS_PER_YEAR.sqrt();

    if standard_deviation <= 0.0 {
        return Err(AppError::Validation(
            "price series has zero variance, probability is undefined".into(),
        ));
    }

    let z_score = (target_return - expected_return) / standard_deviation;
    let probability = 1.0 - Normal::standard().cdf(z_score);

    Ok((expected_return, standard_deviation, z_score, probability))
}

/// Compound the balance through `returns[1..]`, keyed by the matching
/// observation dates. The first return is skipped: the opening value sits
/// on the first date, as the reference implementation emitted it.
fn build_value_history(
    dates: &[NaiveDate],
    returns: &[f64],
    initial_balance: f64,
) -> BTreeMap<NaiveDate, f64> {
    let mut history = BTreeMap::new();
    if dates.is_empty() || returns.is_empty() {
        return history;
    }

    let mut value = initial_balance;
    history.insert(dates[0], value);
    for i in 1..returns.len().min(dates.len()) {
        value *= 1.0 + returns[i];
        history.insert(dates[i], value);
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stats_annualize_mean_and_population_std() {
        let returns = [0.1, -0.1, 0.1];
        let (expected, std, z, p) = probability_stats(&returns, 0.1).unwrap();

        let mean = 0.1 / 3.0;
        assert!((expected - mean * 365.0).abs() < 1e-9);

        let pop_var =
            ((0.1 - mean).powi(2) * 2.0 + (-0.1 - mean).powi(2)) / 3.0;
        assert!((std - pop_var.sqrt() * 365.0_f64.sqrt()).abs() < 1e-9);

        assert!((z - (0.1 - expected) / std).abs() < 1e-9);
        // The target sits far below the expected return: near-certain.
        assert!(p > 0.99);
    }

    #[test]
    fn target_equal_to_expectation_is_a_coin_flip() {
        let returns = [0.02, -0.02, 0.02, -0.02];
        let expected = metrics::mean(&returns) * 365.0;
        let (_, _, z, p) = probability_stats(&returns, expected).unwrap();

        assert!(z.abs() < 1e-12);
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_variance_is_rejected() {
        let returns = [0.01, 0.01, 0.01];
        assert!(probability_stats(&returns, 0.1).is_err());
    }

    #[test]
    fn value_history_skips_the_first_return() {
        let dates = [
            date("2024-01-01"),
            date("2024-01-02"),
            date("2024-01-03"),
            date("2024-01-04"),
        ];
        let returns = [0.5, 0.1, 0.2];

        let history = build_value_history(&dates, &returns, 1000.0);

        // Three entries for three returns; returns[0] never applies.
        assert_eq!(history.len(), 3);
        assert_eq!(history[&date("2024-01-01")], 1000.0);
        assert!((history[&date("2024-01-02")] - 1100.0).abs() < 1e-9);
        assert!((history[&date("2024-01-03")] - 1320.0).abs() < 1e-9);
    }
}
