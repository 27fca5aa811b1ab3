use chrono::{Datelike, Days, Months, NaiveDate};

use crate::models::Granularity;

/// Coarse period identity of a calendar point. Two dates share a key iff
/// they fall into the same rebalancing bucket at that granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKey {
    Day(NaiveDate),
    /// ISO year and ISO week number.
    Week(i32, u32),
    Month(i32, u32),
}

pub fn period_label(date: NaiveDate, granularity: Granularity) -> PeriodKey {
    match granularity {
        Granularity::Day => PeriodKey::Day(date),
        Granularity::Week => {
            let iso = date.iso_week();
            PeriodKey::Week(iso.year(), iso.week())
        }
        Granularity::Month => PeriodKey::Month(date.year(), date.month()),
    }
}

/// Strictly increasing dates from `start` (always included) to `end`
/// inclusive, stepping one day, seven days, or one calendar month.
/// Monthly steps are offset from `start` rather than chained, so a
/// short-month clamp does not shift every later point.
pub fn build_calendar(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> Vec<NaiveDate> {
    let mut calendar = Vec::new();
    let mut step: u64 = 0;

    loop {
        let date = match granularity {
            Granularity::Day => start.checked_add_days(Days::new(step)),
            Granularity::Week => start.checked_add_days(Days::new(step * 7)),
            Granularity::Month => {
                let months = u32::try_from(step).ok();
                months.and_then(|m| start.checked_add_months(Months::new(m)))
            }
        };

        match date {
            Some(date) if date <= end => calendar.push(date),
            _ => break,
        }
        step += 1;
    }

    calendar
}
