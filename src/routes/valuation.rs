use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{ApiResponse, CoinValuation, ValuationRequest};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:coin_id", post(run_valuation))
}

async fn run_valuation(
    Path(coin_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ValuationRequest>,
) -> Result<Json<ApiResponse<CoinValuation>>, AppError> {
    info!("POST /valuation/{} - Valuating coin", coin_id);

    let valuation = services::valuation_service::valuate_coin(
        state.coingecko.as_ref(),
        state.defillama.as_ref(),
        &coin_id,
        &request,
    )
    .await
    .map_err(|e| {
        error!("Valuation failed for {}: {}", coin_id, e);
        e
    })?;

    Ok(Json(ApiResponse::ok("valuation done", valuation)))
}
