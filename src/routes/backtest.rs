use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    ApiResponse, BacktestSummary, MonteCarloRequest, MonteCarloResult, PortfolioBacktestRequest,
    ProbabilityRequest, ProbabilityResult,
};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portfolio", post(run_portfolio_backtest))
        .route("/monte-carlo", post(run_monte_carlo))
        .route("/probability", post(run_probability))
}

async fn run_portfolio_backtest(
    State(state): State<AppState>,
    Json(request): Json<PortfolioBacktestRequest>,
) -> Result<Json<ApiResponse<BacktestSummary>>, AppError> {
    info!(
        "POST /backtest/portfolio - {} assets, {} to {}",
        request.assets.len(),
        request.start_date,
        request.end_date
    );
    request.validate()?;

    let summary =
        services::backtest_service::run_portfolio_backtest(state.market_data.as_ref(), &request)
            .await
            .map_err(|e| {
                error!("Portfolio backtest failed: {}", e);
                e
            })?;

    Ok(Json(ApiResponse::ok(
        "Calculated Portfolio Backtest Result",
        summary,
    )))
}

async fn run_monte_carlo(
    State(state): State<AppState>,
    Json(request): Json<MonteCarloRequest>,
) -> Result<Json<ApiResponse<MonteCarloResult>>, AppError> {
    info!(
        "POST /backtest/monte-carlo - {} over {} days, {} paths",
        request.symbol, request.days, request.simulations
    );
    request.validate()?;

    let result =
        services::monte_carlo_service::calculate_monte_carlo(state.market_data.as_ref(), &request)
            .await
            .map_err(|e| {
                error!("Monte Carlo simulation failed for {}: {}", request.symbol, e);
                e
            })?;

    Ok(Json(ApiResponse::ok(
        format!("Calculated Monte Carlo Simulation Result for {} days", request.days),
        result,
    )))
}

async fn run_probability(
    State(state): State<AppState>,
    Json(request): Json<ProbabilityRequest>,
) -> Result<Json<ApiResponse<ProbabilityResult>>, AppError> {
    info!(
        "POST /backtest/probability - {} target {:.4}",
        request.symbol, request.target_return
    );
    request.validate()?;

    let result =
        services::probability_service::calculate_probability(state.market_data.as_ref(), &request)
            .await
            .map_err(|e| {
                error!("Probability calculation failed for {}: {}", request.symbol, e);
                e
            })?;

    Ok(Json(ApiResponse::ok("Calculated Probability Result", result)))
}
