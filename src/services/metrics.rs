use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

/// Round for display fields; history maps keep full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    variance.sqrt()
}

/// Population standard deviation (ddof = 0).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Period-over-period percentage changes; one element shorter than the
/// input. A non-positive predecessor yields a zero return.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Maximum drawdown against the running peak, in percent. Always in
/// [-100, 0]; 0 for a non-decreasing series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;

    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd * 100.0
}

/// Total return over the window, in percent.
pub fn roi(start_value: f64, end_value: f64) -> f64 {
    if start_value <= 0.0 {
        return 0.0;
    }
    (end_value - start_value) / start_value * 100.0
}

/// Compound annual growth rate in percent. Elapsed years are floored at
/// 0.01 so sub-day windows don't blow up the exponent; a non-positive
/// elapsed time yields 0.
pub fn cagr(start_value: f64, end_value: f64, elapsed_days: i64) -> f64 {
    if elapsed_days <= 0 || start_value <= 0.0 || end_value <= 0.0 {
        return 0.0;
    }
    let years = (elapsed_days as f64 / 365.0).max(0.01);
    ((end_value / start_value).powf(1.0 / years) - 1.0) * 100.0
}

/// Annualized volatility of the value series, in percent: sample std-dev
/// of period returns scaled by sqrt(365). The scaling assumes daily steps
/// and is applied regardless of granularity, matching the reference
/// behavior. None when fewer than two returns exist.
pub fn annualized_volatility(values: &[f64]) -> Option<f64> {
    let returns = pct_changes(values);
    if returns.len() < 2 {
        return None;
    }
    Some(sample_std(&returns) * 365.0_f64.sqrt() * 100.0)
}

/// Month-over-month returns of the value history: last observation per
/// calendar month, consecutive percentage changes keyed `YYYY-MM`.
pub fn monthly_returns(history: &BTreeMap<NaiveDate, f64>) -> BTreeMap<String, f64> {
    let mut month_closes: Vec<((i32, u32), f64)> = Vec::new();
    for (date, value) in history {
        let key = (date.year(), date.month());
        match month_closes.last_mut() {
            Some((last_key, last_value)) if *last_key == key => *last_value = *value,
            _ => month_closes.push((key, *value)),
        }
    }

    month_closes
        .windows(2)
        .filter(|w| w[0].1 > 0.0)
        .map(|w| {
            let (_, prev) = w[0];
            let ((year, month), cur) = w[1];
            (format!("{year:04}-{month:02}"), (cur - prev) / prev * 100.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn drawdown_is_zero_for_monotonic_series() {
        assert_eq!(max_drawdown(&[100.0, 110.0, 110.0, 120.0]), 0.0);
    }

    #[test]
    fn drawdown_measures_decline_from_peak() {
        // Peak 120, trough 90 -> -25%.
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 110.0]);
        assert!((dd - -25.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_stays_within_bounds() {
        let dd = max_drawdown(&[100.0, 0.0, 50.0]);
        assert!(dd >= -100.0 && dd <= 0.0);
    }

    #[test]
    fn roi_matches_total_return() {
        assert!((roi(10_000.0, 14_641.0) - 46.41).abs() < 1e-9);
        assert_eq!(roi(0.0, 100.0), 0.0);
    }

    #[test]
    fn cagr_over_one_year_equals_total_return() {
        let value = cagr(10_000.0, 12_000.0, 365);
        assert!((value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn cagr_floors_elapsed_years_on_short_windows() {
        // 2 elapsed days would be ~0.0055 years; the floor keeps it at 0.01.
        let floored = cagr(100.0, 110.0, 2);
        let expected = ((110.0_f64 / 100.0).powf(1.0 / 0.01) - 1.0) * 100.0;
        assert!((floored - expected).abs() < 1e-6);
    }

    #[test]
    fn cagr_is_zero_for_nonpositive_elapsed_time() {
        assert_eq!(cagr(100.0, 110.0, 0), 0.0);
        assert_eq!(cagr(100.0, 110.0, -3), 0.0);
    }

    #[test]
    fn volatility_needs_at_least_two_returns() {
        assert!(annualized_volatility(&[100.0, 101.0]).is_none());
        assert!(annualized_volatility(&[100.0, 101.0, 99.0]).is_some());
    }

    #[test]
    fn volatility_scales_sample_std_by_sqrt_365() {
        let values = [100.0, 110.0, 99.0, 108.9];
        let returns = pct_changes(&values);
        let expected = sample_std(&returns) * 365.0_f64.sqrt() * 100.0;
        let vol = annualized_volatility(&values).unwrap();
        assert!((vol - expected).abs() < 1e-9);
    }

    #[test]
    fn monthly_returns_use_last_value_per_month() {
        let mut history = BTreeMap::new();
        history.insert(date("2024-01-10"), 100.0);
        history.insert(date("2024-01-31"), 110.0);
        history.insert(date("2024-02-15"), 121.0);
        history.insert(date("2024-02-29"), 132.0);
        history.insert(date("2024-03-31"), 99.0);

        let monthly = monthly_returns(&history);
        assert_eq!(monthly.len(), 2);
        assert!((monthly["2024-02"] - 20.0).abs() < 1e-9);
        assert!((monthly["2024-03"] - -25.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_returns_empty_for_single_month() {
        let mut history = BTreeMap::new();
        history.insert(date("2024-01-10"), 100.0);
        history.insert(date("2024-01-20"), 120.0);

        assert!(monthly_returns(&history).is_empty());
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round2(46.4099), 46.41);
        assert_eq!(round2(-0.005), -0.01);
    }
}
