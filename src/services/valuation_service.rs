use tracing::info;

use crate::errors::AppError;
use crate::external::coingecko::{CoinGeckoClient, CoinMarketStats};
use crate::external::defillama::DefiLlamaClient;
use crate::external::market_data::MarketDataError;
use crate::models::{CoinValuation, ValuationRequest};
use crate::services::metrics;

pub async fn valuate_coin(
    coingecko: &CoinGeckoClient,
    defillama: &DefiLlamaClient,
    coin_id: &str,
    request: &ValuationRequest,
) -> Result<CoinValuation, AppError> {
    let stats = coingecko
        .fetch_coin_stats(coin_id)
        .await
        .map_err(|e| match e {
            MarketDataError::NoData(id) => AppError::NotFound(format!("unknown coin {id}")),
            other => AppError::from_provider(coin_id, other),
        })?;

    let tvl = defillama
        .fetch_tvl(coin_id)
        .await
        .map_err(|e| AppError::from_provider(coin_id, e))?;

    info!(
        "Valuating {}: market_cap={} price={} tvl={}",
        coin_id, stats.market_cap, stats.price, tvl
    );

    // On-chain volume from the caller when known, otherwise back out a
    // coin-denominated volume from the exchange's USD figure.
    let transaction_volume = if request.transaction_volume > 0.0 {
        request.transaction_volume
    } else if stats.price > 0.0 {
        stats.daily_volume / stats.price
    } else {
        0.0
    };

    let nvt = nvt_ratio(stats.market_cap, transaction_volume * stats.price);
    let fair_price_range = fair_price_range(&stats, request, transaction_volume);

    Ok(CoinValuation {
        market_cap: format_usd(stats.market_cap, 0),
        price: format_usd(stats.price, 2),
        burn_daily: format!("{}", (request.burn_daily * stats.price) as i64),
        fees_daily: format!(
            "{}-{}",
            (request.fees_daily * stats.price * 0.8) as i64,
            (request.fees_daily * stats.price * 1.2) as i64
        ),
        active_wallets: format!("{}", request.active_wallets as i64),
        tvl: format_usd(tvl, 2),
        inflation: format!("{}", request.inflation),
        nvt,
        fair_price_range,
    })
}

/// Network-value-to-transactions ratio; undefined without volume.
fn nvt_ratio(market_cap: f64, transaction_volume_usd: f64) -> Option<f64> {
    if transaction_volume_usd > 0.0 {
        Some(metrics::round2(market_cap / transaction_volume_usd))
    } else {
        None
    }
}

/// Heuristic fair-price band. The floor prices the burn- and
/// inflation-adjusted supply at 50x daily volume (boosted by wallet
/// activity); the ceiling capitalizes annual fees at 100x. Either side
/// falls back to ±20% of the spot price when its inputs vanish.
fn fair_price_range(
    stats: &CoinMarketStats,
    request: &ValuationRequest,
    transaction_volume: f64,
) -> String {
    let burn_daily_usd = request.burn_daily * stats.price;
    let fees_daily_usd = request.fees_daily * stats.price;
    let transaction_volume_usd = transaction_volume * stats.price;

    let annual_burn_usd = burn_daily_usd * 365.0;
    let burn_impact = if stats.price > 0.0 && stats.circulating_supply > 0.0 {
        annual_burn_usd / (stats.price * stats.circulating_supply)
    } else {
        0.0
    };
    let supply_adjustment = 1.0 - burn_impact + request.inflation / 100.0;
    let adjusted_supply = stats.circulating_supply * supply_adjustment;

    let volume_boost = if request.active_wallets > 0.0 {
        1.0 + request.active_wallets / 1_000_000.0 * 0.1
    } else {
        1.0
    };
    let adjusted_volume_usd = transaction_volume_usd * volume_boost;

    let min_price = if adjusted_volume_usd > 0.0 && adjusted_supply > 0.0 {
        50.0 * adjusted_volume_usd / adjusted_supply
    } else {
        stats.price * 0.8
    };

    let annual_fees_usd = fees_daily_usd * 365.0;
    let max_price = if annual_fees_usd > 0.0 && stats.circulating_supply > 0.0 {
        annual_fees_usd * 100.0 / stats.circulating_supply
    } else {
        stats.price * 1.2
    };

    format!("{min_price:.4}-{max_price:.4}")
}

/// `$`-prefixed, thousands-separated amount with a fixed number of
/// decimals, matching the dashboard's display format.
fn format_usd(amount: f64, decimals: usize) -> String {
    let formatted = format!("{amount:.decimals$}");
    let (number, fraction) = match formatted.split_once('.') {
        Some((int_part, frac)) => (int_part.to_string(), Some(frac.to_string())),
        None => (formatted, None),
    };

    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(frac) => format!("{sign}${grouped}.{frac}"),
        None => format!("{sign}${grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> CoinMarketStats {
        CoinMarketStats {
            market_cap: 1_000_000.0,
            price: 2.0,
            circulating_supply: 500_000.0,
            daily_volume: 40_000.0,
        }
    }

    #[test]
    fn nvt_divides_cap_by_usd_volume() {
        assert_eq!(nvt_ratio(1_000_000.0, 40_000.0), Some(25.0));
        assert_eq!(nvt_ratio(1_000_000.0, 0.0), None);
    }

    #[test]
    fn fair_price_falls_back_to_spot_band_without_fees_or_volume() {
        let request = ValuationRequest {
            burn_daily: 0.0,
            fees_daily: 0.0,
            active_wallets: 0.0,
            inflation: 0.0,
            transaction_volume: 0.0,
        };

        let range = fair_price_range(&stats(), &request, 0.0);
        // No volume -> 0.8x spot floor; no fees -> 1.2x spot ceiling.
        assert_eq!(range, "1.6000-2.4000");
    }

    #[test]
    fn fair_price_uses_volume_floor_and_fee_ceiling() {
        let request = ValuationRequest {
            burn_daily: 0.0,
            fees_daily: 100.0,
            active_wallets: 0.0,
            inflation: 0.0,
            transaction_volume: 20_000.0,
        };

        let range = fair_price_range(&stats(), &request, 20_000.0);
        // Floor: 50 * 40000 / 500000 = 4; ceiling: 100*2*365*100 / 500000 = 14.6.
        assert_eq!(range, "4.0000-14.6000");
    }

    #[test]
    fn wallet_activity_boosts_the_floor() {
        let quiet = ValuationRequest {
            burn_daily: 0.0,
            fees_daily: 0.0,
            active_wallets: 0.0,
            inflation: 0.0,
            transaction_volume: 20_000.0,
        };
        let busy = ValuationRequest {
            active_wallets: 1_000_000.0,
            ..quiet.clone()
        };

        let quiet_floor: f64 = fair_price_range(&stats(), &quiet, 20_000.0)
            .split('-')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        let busy_floor: f64 = fair_price_range(&stats(), &busy, 20_000.0)
            .split('-')
            .next()
            .unwrap()
            .parse()
            .unwrap();

        assert!(busy_floor > quiet_floor);
    }

    #[test]
    fn usd_formatting_groups_thousands() {
        assert_eq!(format_usd(1_234_567.0, 0), "$1,234,567");
        assert_eq!(format_usd(1_234_567.891, 2), "$1,234,567.89");
        assert_eq!(format_usd(2.5, 2), "$2.50");
        assert_eq!(format_usd(999.0, 0), "$999");
        assert_eq!(format_usd(0.0, 2), "$0.00");
    }
}
