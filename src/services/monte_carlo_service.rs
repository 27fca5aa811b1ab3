use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::errors::AppError;
use crate::external::market_data::{Candle, MarketDataProvider};
use crate::models::{Granularity, MonteCarloRequest, MonteCarloResult};
use crate::services::market_service::fetch_single_series;
use crate::services::metrics;

/// Return distribution estimated from history, feeding the simulation.
#[derive(Debug, Clone, Copy)]
struct ReturnStats {
    mean: f64,
    std_dev: f64,
    current_price: f64,
}

pub async fn calculate_monte_carlo(
    provider: &dyn MarketDataProvider,
    request: &MonteCarloRequest,
) -> Result<MonteCarloResult, AppError> {
    let granularity = Granularity::parse(&request.timeframe)
        .ok_or_else(|| AppError::UnsupportedGranularity(request.timeframe.clone()))?;

    if request.start_date >= request.end_date {
        return Err(AppError::InvalidRange);
    }

    let candles = fetch_single_series(
        provider,
        &request.symbol,
        granularity,
        request.start_date,
        request.end_date,
    )
    .await?;

    let stats = summarize_returns(&candles);
    info!(
        "Monte Carlo for {}: mean={:.6} std={:.6} over {} candles",
        request.symbol,
        stats.mean,
        stats.std_dev,
        candles.len()
    );

    let simulated = run_simulations(
        stats,
        request.target_return,
        request.days as usize,
        request.simulations as usize,
    )?;

    Ok(MonteCarloResult {
        symbol: request.symbol.clone(),
        predicted_price: metrics::round2(simulated.predicted_price),
        probability_above_target: metrics::round2(simulated.probability_above_target),
        min_price: metrics::round2(simulated.min_price),
        max_price: metrics::round2(simulated.max_price),
    })
}

/// Per-period return stats with the first (undefined) return counted as
/// zero, exactly as the reference pipeline's `pct_change().fillna(0)` did.
fn summarize_returns(candles: &[Candle]) -> ReturnStats {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let mut returns = vec![0.0];
    returns.extend(metrics::pct_changes(&closes));

    ReturnStats {
        mean: metrics::mean(&returns),
        std_dev: metrics::sample_std(&returns),
        current_price: closes.last().copied().unwrap_or(0.0),
    }
}

struct SimulationOutcome {
    predicted_price: f64,
    probability_above_target: f64,
    min_price: f64,
    max_price: f64,
}

fn run_simulations(
    stats: ReturnStats,
    target_return: f64,
    days: usize,
    simulations: usize,
) -> Result<SimulationOutcome, AppError> {
    let normal = Normal::new(stats.mean, stats.std_dev)
        .map_err(|e| AppError::Validation(format!("invalid return distribution: {e}")))?;
    let mut rng = rand::rng();

    let mut final_prices = Vec::with_capacity(simulations);
    for _ in 0..simulations {
        let mut price = stats.current_price;
        for _ in 0..days {
            let period_return: f64 = normal.sample(&mut rng);
            price *= 1.0 + period_return;
        }
        final_prices.push(price);
    }

    let target_price = stats.current_price * (1.0 + target_return);
    let above = final_prices.iter().filter(|p| **p >= target_price).count();

    Ok(SimulationOutcome {
        predicted_price: metrics::mean(&final_prices),
        probability_above_target: above as f64 / final_prices.len() as f64 * 100.0,
        min_price: final_prices.iter().copied().fold(f64::INFINITY, f64::min),
        max_price: final_prices
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max),
    })
}
