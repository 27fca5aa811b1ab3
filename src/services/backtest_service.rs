use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::market_data::{Candle, MarketDataError, MarketDataProvider};
use crate::models::{BacktestSummary, Granularity, PortfolioBacktestRequest};
use crate::services::calendar::{build_calendar, period_label};
use crate::services::metrics;

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub initial_balance: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
    pub rebalance_enabled: bool,
    pub fee_rate: f64,
    pub slippage: f64,
}

/// Outcome of the calendar walk: the portfolio value at every calendar
/// point, plus the symbols that never entered the simulation.
#[derive(Debug)]
pub struct PortfolioWalk {
    pub history: BTreeMap<NaiveDate, f64>,
    pub skipped_symbols: Vec<String>,
}

pub async fn run_portfolio_backtest(
    provider: &dyn MarketDataProvider,
    request: &PortfolioBacktestRequest,
) -> Result<BacktestSummary, AppError> {
    let granularity = Granularity::parse(&request.rebalance_period)
        .ok_or_else(|| AppError::UnsupportedGranularity(request.rebalance_period.clone()))?;

    if request.start_date >= request.end_date {
        return Err(AppError::InvalidRange);
    }

    let symbols: Vec<String> = request.assets.keys().cloned().collect();
    let series = fetch_series(
        provider,
        &symbols,
        granularity,
        request.start_date,
        request.end_date,
    )
    .await?;

    let params = SimulationParams {
        initial_balance: request.initial_balance,
        start: request.start_date,
        end: request.end_date,
        granularity,
        rebalance_enabled: request.rebalance,
        fee_rate: request.fee_rate,
        slippage: request.slippage,
    };

    let walk = simulate_portfolio(&symbols, &request.assets, &series, &params)?;
    Ok(summarize(request.initial_balance, walk))
}

/// Fetch each symbol's series in turn. A symbol the exchange has no data
/// for is left out (the simulation skips it); any other provider failure
/// aborts the whole request.
async fn fetch_series(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    granularity: Granularity,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BTreeMap<String, Vec<Candle>>, AppError> {
    let mut series = BTreeMap::new();

    for symbol in symbols {
        info!("Fetching price history for {}", symbol);
        match provider.fetch_ohlcv(symbol, granularity, start, end).await {
            Ok(candles) => {
                series.insert(symbol.clone(), candles);
            }
            Err(MarketDataError::NoData(_)) => {
                warn!("No data returned for {}", symbol);
            }
            Err(e) => return Err(AppError::from_provider(symbol, e)),
        }
    }

    Ok(series)
}

/// The rebalancing walk itself. Sequential by construction: every step's
/// asset values depend on the previous step's.
pub fn simulate_portfolio(
    symbols: &[String],
    weights: &BTreeMap<String, f64>,
    series: &BTreeMap<String, Vec<Candle>>,
    params: &SimulationParams,
) -> Result<PortfolioWalk, AppError> {
    if params.start >= params.end {
        return Err(AppError::InvalidRange);
    }
    for symbol in symbols {
        if !weights.contains_key(symbol) {
            return Err(AppError::MissingWeight(symbol.clone()));
        }
    }

    let calendar = build_calendar(params.start, params.end, params.granularity);
    if calendar.len() < 2 {
        return Err(AppError::Validation(
            "date range holds fewer than two rebalance periods".into(),
        ));
    }

    let mut skipped_symbols = Vec::new();
    let mut returns: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for symbol in symbols {
        match series.get(symbol) {
            Some(candles) if !candles.is_empty() => {
                returns.insert(symbol, return_series(&calendar, candles));
            }
            _ => {
                warn!("Data for {} is empty after filtering, excluding it", symbol);
                skipped_symbols.push(symbol.clone());
            }
        }
    }

    // Symbols without data receive no allocation, so the simulated total
    // can start below initial_balance. Known approximation, surfaced via
    // skipped_symbols.
    let mut asset_values: BTreeMap<&str, f64> = returns
        .keys()
        .map(|&symbol| (symbol, params.initial_balance * weights[symbol]))
        .collect();

    let mut history = BTreeMap::new();
    history.insert(calendar[0], asset_values.values().sum::<f64>());

    // The first calendar point seeds the period marker, so it can never
    // trigger a rebalance itself.
    let mut prev_label = period_label(calendar[0], params.granularity);
    let cost_factor = 1.0 - params.fee_rate - params.slippage;

    for (step, &date) in calendar.iter().enumerate().skip(1) {
        for (symbol, value) in asset_values.iter_mut() {
            let period_return = returns[*symbol].get(step).copied().unwrap_or(0.0);
            *value *= 1.0 + period_return;
        }

        let label = period_label(date, params.granularity);
        if params.rebalance_enabled && label != prev_label {
            // Reset to target weights, charging fee + slippage on the full
            // post-rebalance value of every asset rather than the turnover
            // delta.
            let total: f64 = asset_values.values().sum();
            for (symbol, value) in asset_values.iter_mut() {
                *value = total * weights[*symbol] * cost_factor;
            }
        }
        prev_label = label;

        history.insert(date, asset_values.values().sum::<f64>());
    }

    Ok(PortfolioWalk {
        history,
        skipped_symbols,
    })
}

/// Per-calendar-point returns for one symbol: forward-fill the last known
/// close onto the calendar, then take percentage changes. Leading gaps,
/// exhausted data, and constant prices all come out as zero returns.
fn return_series(calendar: &[NaiveDate], candles: &[Candle]) -> Vec<f64> {
    let mut closes: Vec<Option<f64>> = Vec::with_capacity(calendar.len());
    let mut next = 0;
    let mut last_close = None;

    for &date in calendar {
        while next < candles.len() && candles[next].date <= date {
            last_close = Some(candles[next].close);
            next += 1;
        }
        closes.push(last_close);
    }

    let mut returns = vec![0.0; calendar.len()];
    for i in 1..calendar.len() {
        if let (Some(prev), Some(cur)) = (closes[i - 1], closes[i]) {
            if prev > 0.0 {
                returns[i] = (cur - prev) / prev;
            }
        }
    }
    returns
}

fn summarize(initial_balance: f64, walk: PortfolioWalk) -> BacktestSummary {
    let values: Vec<f64> = walk.history.values().copied().collect();
    let first = values.first().copied().unwrap_or(0.0);
    let last = values.last().copied().unwrap_or(0.0);

    let elapsed_days = match (walk.history.keys().next(), walk.history.keys().next_back()) {
        (Some(start), Some(end)) => (*end - *start).num_days(),
        _ => 0,
    };

    let monthly_returns = metrics::monthly_returns(&walk.history)
        .into_iter()
        .map(|(month, ret)| (month, metrics::round2(ret)))
        .collect();

    BacktestSummary {
        initial_balance,
        final_balance: metrics::round2(last),
        roi: metrics::round2(metrics::roi(first, last)),
        mdd: metrics::round2(metrics::max_drawdown(&values)),
        cagr: metrics::round2(metrics::cagr(first, last, elapsed_days)),
        volatility: metrics::annualized_volatility(&values).map(metrics::round2),
        monthly_returns,
        skipped_symbols: walk.skipped_symbols,
        portfolio_value_history: walk.history,
    }
}
