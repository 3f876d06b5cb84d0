//! Compares a persisted attendance snapshot against a fresh recomputation
//! from the source rows, so drift is reported instead of discovered later.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::generator::AttendanceDay;

const HOURS_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDrift {
    pub date: NaiveDate,
    pub field: &'static str,
    pub stored: String,
    pub recomputed: String,
}

fn drift(date: NaiveDate, field: &'static str, stored: impl ToString, recomputed: impl ToString) -> DayDrift {
    DayDrift {
        date,
        field,
        stored: stored.to_string(),
        recomputed: recomputed.to_string(),
    }
}

fn hours_differ(a: f64, b: f64) -> bool {
    (a - b).abs() > HOURS_TOLERANCE
}

fn compare_day(stored: &AttendanceDay, fresh: &AttendanceDay, out: &mut Vec<DayDrift>) {
    let date = fresh.date;

    if stored.day_type != fresh.day_type {
        out.push(drift(date, "day_type", stored.day_type, fresh.day_type));
    }
    if stored.status != fresh.status {
        out.push(drift(date, "status", stored.status, fresh.status));
    }
    if stored.is_holiday != fresh.is_holiday {
        out.push(drift(date, "is_holiday", stored.is_holiday, fresh.is_holiday));
    }
    if stored.is_rest_day != fresh.is_rest_day {
        out.push(drift(date, "is_rest_day", stored.is_rest_day, fresh.is_rest_day));
    }

    let hour_fields = [
        ("regular_hours", stored.regular_hours, fresh.regular_hours),
        ("overtime_hours", stored.overtime_hours, fresh.overtime_hours),
        (
            "unapproved_overtime_hours",
            stored.unapproved_overtime_hours,
            fresh.unapproved_overtime_hours,
        ),
        ("night_diff_hours", stored.night_diff_hours, fresh.night_diff_hours),
        ("night_diff_ot_hours", stored.night_diff_ot_hours, fresh.night_diff_ot_hours),
        ("paid_holiday_hours", stored.paid_holiday_hours, fresh.paid_holiday_hours),
        ("leave_hours", stored.leave_hours, fresh.leave_hours),
    ];
    for (field, a, b) in hour_fields {
        if hours_differ(a, b) {
            out.push(drift(date, field, a, b));
        }
    }
}

/// Every difference between `stored` and `fresh`, ordered by date.
///
/// Dates present on only one side are reported with field `date`; this is how
/// entries filed under the wrong year or month show up.
pub fn diff_days(stored: &[AttendanceDay], fresh: &[AttendanceDay]) -> Vec<DayDrift> {
    let stored_by_date: BTreeMap<NaiveDate, &AttendanceDay> =
        stored.iter().map(|d| (d.date, d)).collect();
    let fresh_by_date: BTreeMap<NaiveDate, &AttendanceDay> =
        fresh.iter().map(|d| (d.date, d)).collect();

    let mut out = Vec::new();
    for (date, fresh_day) in &fresh_by_date {
        match stored_by_date.get(date) {
            Some(stored_day) => compare_day(stored_day, fresh_day, &mut out),
            None => out.push(drift(*date, "date", "missing", "present")),
        }
    }
    for date in stored_by_date.keys() {
        if !fresh_by_date.contains_key(date) {
            out.push(drift(*date, "date", "present", "outside period"));
        }
    }

    out.sort_by_key(|d| d.date);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timesheet::{
        classifier::{CalendarHoliday, RestDaySchedule},
        generator::{ClockEntryInput, DayStatus, TimesheetInput, generate_timesheet},
        BiMonthlyPeriod, Eligibility, ShiftRules,
    };
    use crate::model::holiday::HolidayKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn generate(entries: &[ClockEntryInput], holidays: &[CalendarHoliday]) -> Vec<AttendanceDay> {
        let rest = RestDaySchedule::sundays();
        let rules = ShiftRules::default();
        generate_timesheet(&TimesheetInput {
            employee_id: 1,
            eligibility: Eligibility {
                overtime: true,
                night_diff: true,
            },
            period: BiMonthlyPeriod::containing(d(2026, 6, 1)),
            entries,
            history_start: d(2026, 6, 1),
            holidays,
            rest_days: &rest,
            overtime: &[],
            leave: &[],
            rules: &rules,
        })
        .days
    }

    fn worked(day: u32) -> ClockEntryInput {
        ClockEntryInput {
            id: u64::from(day),
            clock_in: d(2026, 6, day).and_hms_opt(9, 0, 0).unwrap(),
            clock_out: d(2026, 6, day).and_hms_opt(18, 0, 0),
        }
    }

    #[test]
    fn identical_snapshots_have_no_drift() {
        let days = generate(&[worked(2)], &[]);
        assert!(diff_days(&days, &days).is_empty());
    }

    #[test]
    fn missing_holiday_flag_is_reported() {
        let holidays = [CalendarHoliday {
            date: d(2026, 6, 12),
            name: "Independence Day".to_string(),
            kind: HolidayKind::Regular,
        }];
        let stored = generate(&[], &[]);
        let fresh = generate(&[], &holidays);

        let drift = diff_days(&stored, &fresh);
        assert!(drift.iter().any(|x| x.field == "is_holiday" && x.date == d(2026, 6, 12)));
        assert!(drift.iter().any(|x| x.field == "day_type"));
    }

    #[test]
    fn stale_hours_are_reported() {
        let stored = generate(&[], &[]);
        let fresh = generate(&[worked(3)], &[]);

        let drift = diff_days(&stored, &fresh);
        let fields: Vec<_> = drift.iter().map(|x| x.field).collect();
        assert!(fields.contains(&"status"));
        assert!(fields.contains(&"regular_hours"));
        assert!(drift.iter().all(|x| x.date == d(2026, 6, 3)));
    }

    #[test]
    fn wrong_year_dates_show_up_on_both_sides() {
        let fresh = generate(&[], &[]);
        let mut stored = fresh.clone();
        stored[0].date = d(2025, 6, 1);
        stored[0].status = DayStatus::Present;

        let drift = diff_days(&stored, &fresh);
        assert_eq!(drift.len(), 2);
        assert_eq!(drift[0].date, d(2025, 6, 1));
        assert_eq!(drift[0].recomputed, "outside period");
        assert_eq!(drift[1].date, d(2026, 6, 1));
        assert_eq!(drift[1].stored, "missing");
    }

    #[test]
    fn unapproved_overtime_change_is_reported() {
        let fresh = generate(&[worked(2)], &[]);
        let mut stored = fresh.clone();
        stored[1].unapproved_overtime_hours += 1.5;

        let drift = diff_days(&stored, &fresh);
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].field, "unapproved_overtime_hours");
        assert_eq!(drift[0].date, d(2026, 6, 2));
    }

    #[test]
    fn sub_tolerance_rounding_is_ignored() {
        let fresh = generate(&[worked(2)], &[]);
        let mut stored = fresh.clone();
        stored[1].regular_hours += 0.004;
        assert!(diff_days(&stored, &fresh).is_empty());
    }
}
