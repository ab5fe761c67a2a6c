use chrono::{Datelike, NaiveDate};
use tracing::warn;

use super::super::clock::DayBoundary;
use super::super::domain::{GstReturn, ReturnStatus};
use super::views::ComplianceMetric;

/// The `count` calendar months ending with the month of `today`, oldest first.
///
/// Months before the first representable date are dropped.
pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<(i32, u32)> {
    let current = i64::from(today.year()) * 12 + i64::from(today.month0());
    (0..i64::from(count))
        .rev()
        .filter_map(|back| {
            let index = current - back;
            let year = i32::try_from(index.div_euclid(12)).ok()?;
            let month = index.rem_euclid(12) as u32 + 1;
            NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
        })
        .collect()
}

pub(crate) fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

/// Rate as a whole percentage; zero when nothing was due.
pub(crate) fn compliance_rate(filed: u32, due: u32) -> u8 {
    if due == 0 {
        return 0;
    }
    (f64::from(filed) * 100.0 / f64::from(due)).round().min(100.0) as u8
}

/// Metrics for returns that fall due in the given month.
pub(crate) fn month_metric(
    year: i32,
    month: u32,
    returns: &[GstReturn],
    boundary: DayBoundary,
) -> ComplianceMetric {
    let mut returns_due = 0;
    let mut returns_filed = 0;
    let mut late_filings = 0;

    for record in returns {
        let due_date = match record.due_date.parse() {
            Ok(date) => date,
            Err(error) => {
                warn!(
                    obligation_id = %record.id,
                    %error,
                    "ignoring return with malformed due date"
                );
                continue;
            }
        };
        if due_date.year() != year || due_date.month() != month {
            continue;
        }

        returns_due += 1;
        if record.status == ReturnStatus::Filed {
            returns_filed += 1;
        }
        if let Some(filed_at) = record.filed_at {
            if boundary.today(filed_at) > due_date {
                late_filings += 1;
            }
        }
    }

    ComplianceMetric {
        year,
        month,
        label: month_label(year, month),
        returns_filed,
        returns_due,
        late_filings,
        compliance_rate: compliance_rate(returns_filed, returns_due),
    }
}
