use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::ApiResponse;
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/tickers", get(get_tickers))
}

#[derive(Debug, Deserialize)]
struct TickerQuery {
    quote: Option<String>,
}

async fn get_tickers(
    Query(params): Query<TickerQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    info!(
        "GET /market/tickers - quote={}",
        params.quote.as_deref().unwrap_or("any")
    );

    let tickers =
        services::market_service::list_tickers(state.market_data.as_ref(), params.quote.as_deref())
            .await
            .map_err(|e| {
                error!("Failed to list tickers: {}", e);
                e
            })?;

    Ok(Json(ApiResponse::ok("Ticker List", tickers)))
}
