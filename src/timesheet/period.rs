use chrono::{Datelike, Duration, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Semi-monthly payroll cutoff: 1st-15th or 16th-end of month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display(fmt = "{} to {}", start, end)]
pub struct BiMonthlyPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

impl BiMonthlyPeriod {
    /// The period a calendar date falls into.
    pub fn containing(date: NaiveDate) -> Self {
        if date.day() <= 15 {
            Self {
                start: date.with_day(1).unwrap_or(date),
                end: date.with_day(15).unwrap_or(date),
            }
        } else {
            Self {
                start: date.with_day(16).unwrap_or(date),
                end: last_day_of_month(date.year(), date.month()),
            }
        }
    }

    /// Rebuilds a period from its stored start date.
    pub fn from_start(start: NaiveDate) -> AppResult<Self> {
        match start.day() {
            1 | 16 => Ok(Self::containing(start)),
            _ => Err(AppError::validation(format!(
                "{start} is not a period start (must be the 1st or the 16th)"
            ))),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn next(&self) -> Self {
        Self::containing(self.end + Duration::days(1))
    }

    pub fn previous(&self) -> Self {
        Self::containing(self.start - Duration::days(1))
    }

    pub fn is_first_half(&self) -> bool {
        self.start.day() == 1
    }

    /// `2026-02-A` for the first half, `2026-02-B` for the second.
    pub fn label(&self) -> String {
        format!(
            "{}-{:02}-{}",
            self.start.year(),
            self.start.month(),
            if self.is_first_half() { 'A' } else { 'B' }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn first_half_ends_on_the_fifteenth() {
        let p = BiMonthlyPeriod::containing(d(2026, 3, 15));
        assert_eq!(p.start, d(2026, 3, 1));
        assert_eq!(p.end, d(2026, 3, 15));
        assert_eq!(p.len_days(), 15);
        assert_eq!(p.label(), "2026-03-A");
    }

    #[test]
    fn second_half_runs_to_month_end() {
        assert_eq!(BiMonthlyPeriod::containing(d(2026, 3, 16)).end, d(2026, 3, 31));
        assert_eq!(BiMonthlyPeriod::containing(d(2026, 4, 30)).end, d(2026, 4, 30));
        assert_eq!(BiMonthlyPeriod::containing(d(2026, 2, 20)).end, d(2026, 2, 28));
        assert_eq!(BiMonthlyPeriod::containing(d(2028, 2, 29)).end, d(2028, 2, 29));
    }

    #[test]
    fn december_second_half_and_next_crosses_year() {
        let p = BiMonthlyPeriod::containing(d(2025, 12, 24));
        assert_eq!(p.end, d(2025, 12, 31));
        assert_eq!(p.next().start, d(2026, 1, 1));
        assert_eq!(p.next().previous(), p);
    }

    #[test]
    fn from_start_rejects_mid_period_dates() {
        assert!(BiMonthlyPeriod::from_start(d(2026, 1, 16)).is_ok());
        assert!(BiMonthlyPeriod::from_start(d(2026, 1, 3)).is_err());
    }

    #[test]
    fn days_iterates_inclusive_range() {
        let p = BiMonthlyPeriod::containing(d(2026, 2, 16));
        let days: Vec<_> = p.days().collect();
        assert_eq!(days.len(), 13);
        assert_eq!(days.first(), Some(&d(2026, 2, 16)));
        assert_eq!(days.last(), Some(&d(2026, 2, 28)));
        assert!(p.contains(d(2026, 2, 28)));
        assert!(!p.contains(d(2026, 3, 1)));
    }
}
