//! Builds the per-day attendance ledger of one employee for one payroll
//! period. This is a pure function of its inputs: the same clock entries,
//! holidays, rest days, approved overtime and approved leave always produce the
//! same timesheet.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum_macros::{AsRefStr, Display, EnumString};

use super::allocator::{ClockSpan, Eligibility, HourBreakdown, ShiftRules, allocate_day};
use super::classifier::{CalendarHoliday, DayClass, DayClassifier, DayType, RestDaySchedule};
use super::period::BiMonthlyPeriod;

/// How far back to look for the working day that precedes a holiday.
pub const HOLIDAY_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockEntryInput {
    pub id: u64,
    pub clock_in: NaiveDateTime,
    pub clock_out: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedOvertime {
    pub date: NaiveDate,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedLeave {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub leave_type: String,
    pub paid: bool,
}

pub struct TimesheetInput<'a> {
    pub employee_id: u64,
    pub eligibility: Eligibility,
    pub period: BiMonthlyPeriod,
    /// Entries may start before the period; earlier ones only feed the
    /// holiday-pay look-back.
    pub entries: &'a [ClockEntryInput],
    /// First date covered by `entries`. Days before it are treated as unknown.
    pub history_start: NaiveDate,
    pub holidays: &'a [CalendarHoliday],
    pub rest_days: &'a RestDaySchedule,
    pub overtime: &'a [ApprovedOvertime],
    pub leave: &'a [ApprovedLeave],
    pub rules: &'a ShiftRules,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayStatus {
    Present,
    Absent,
    RestDay,
    Holiday,
    OnLeave,
    /// Clocked in but never clocked out.
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    pub day_name: String,
    pub day_type: DayType,
    pub status: DayStatus,
    pub is_holiday: bool,
    pub holiday_name: Option<String>,
    pub is_rest_day: bool,
    pub is_sunday: bool,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    pub entry_ids: Vec<u64>,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub unapproved_overtime_hours: f64,
    pub night_diff_hours: f64,
    pub night_diff_ot_hours: f64,
    pub paid_holiday_hours: f64,
    pub leave_hours: f64,
    pub leave_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimesheetTotals {
    pub days_present: u32,
    pub days_absent: u32,
    pub days_on_leave: u32,
    pub days_incomplete: u32,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub unapproved_overtime_hours: f64,
    pub night_diff_hours: f64,
    pub night_diff_ot_hours: f64,
    pub rest_day_hours: f64,
    pub holiday_hours_worked: f64,
    pub paid_holiday_hours: f64,
    pub leave_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timesheet {
    pub employee_id: u64,
    pub period: BiMonthlyPeriod,
    pub days: Vec<AttendanceDay>,
    pub totals: TimesheetTotals,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct DayEntries {
    spans: Vec<ClockSpan>,
    ids: Vec<u64>,
    first_in: Option<NaiveDateTime>,
    last_out: Option<NaiveDateTime>,
    has_open: bool,
}

fn group_entries(entries: &[ClockEntryInput]) -> BTreeMap<NaiveDate, DayEntries> {
    let mut by_date: BTreeMap<NaiveDate, DayEntries> = BTreeMap::new();
    for entry in entries {
        let day = by_date.entry(entry.clock_in.date()).or_default();
        day.ids.push(entry.id);
        day.first_in = Some(day.first_in.map_or(entry.clock_in, |t| t.min(entry.clock_in)));
        match entry.clock_out {
            Some(out) => {
                day.spans.push(ClockSpan {
                    clock_in: entry.clock_in,
                    clock_out: out,
                });
                day.last_out = Some(day.last_out.map_or(out, |t| t.max(out)));
            }
            None => day.has_open = true,
        }
    }
    by_date
}

fn leave_on<'a>(leave: &'a [ApprovedLeave], date: NaiveDate) -> Option<&'a ApprovedLeave> {
    leave.iter().find(|l| l.start <= date && date <= l.end)
}

/// Builds the canonical per-day ledger for `input.period`.
pub fn generate_timesheet(input: &TimesheetInput<'_>) -> Timesheet {
    let classifier = DayClassifier::new(input.holidays, input.rest_days);
    let entries = group_entries(input.entries);

    let mut ot_by_date: HashMap<NaiveDate, i64> = HashMap::new();
    for ot in input.overtime {
        *ot_by_date.entry(ot.date).or_default() += ot.minutes;
    }

    let standard_hours = input.rules.standard_hours();
    let mut days = Vec::with_capacity(input.period.len_days() as usize);

    for date in input.period.days() {
        let class = classifier.classify(date);
        let day_entries = entries.get(&date);

        let hours = day_entries
            .map(|e| {
                allocate_day(
                    &e.spans,
                    ot_by_date.get(&date).copied().unwrap_or(0),
                    input.eligibility,
                    input.rules,
                )
            })
            .unwrap_or_default();

        let worked = hours.worked_minutes > 0;
        let open = day_entries.is_some_and(|e| e.has_open);
        let leave = leave_on(input.leave, date).filter(|_| class.is_working_day());

        let (status, leave_hours, leave_type) = if open {
            (DayStatus::Incomplete, 0.0, None)
        } else if worked {
            (DayStatus::Present, 0.0, None)
        } else if let Some(l) = leave {
            let paid = if l.paid { standard_hours } else { 0.0 };
            (DayStatus::OnLeave, paid, Some(l.leave_type.clone()))
        } else if class.day_type.is_holiday() {
            (DayStatus::Holiday, 0.0, None)
        } else if class.day_type.is_rest_day() {
            (DayStatus::RestDay, 0.0, None)
        } else {
            (DayStatus::Absent, 0.0, None)
        };

        let paid_holiday_hours = if status == DayStatus::Holiday
            && class.day_type == DayType::RegularHoliday
            && worked_preceding_day(input, &classifier, &entries, date)
        {
            standard_hours
        } else {
            0.0
        };

        days.push(build_day(
            &class,
            status,
            day_entries,
            &hours,
            paid_holiday_hours,
            leave_hours,
            leave_type,
        ));
    }

    let totals = summarize(&days);
    Timesheet {
        employee_id: input.employee_id,
        period: input.period,
        days,
        totals,
    }
}

/// Regular-holiday pay is only earned when the employee reported (or was on
/// paid leave) on the nearest working day before the holiday. A working day
/// before `history_start` is unknown and gives the benefit of the doubt.
fn worked_preceding_day(
    input: &TimesheetInput<'_>,
    classifier: &DayClassifier<'_>,
    entries: &BTreeMap<NaiveDate, DayEntries>,
    holiday: NaiveDate,
) -> bool {
    for back in 1..=HOLIDAY_LOOKBACK_DAYS {
        let date = holiday - Duration::days(back);
        if !classifier.classify(date).is_working_day() {
            continue;
        }
        if date < input.history_start {
            return true;
        }
        let reported = entries
            .get(&date)
            .is_some_and(|e| e.has_open || !e.spans.is_empty());
        let paid_leave = leave_on(input.leave, date).is_some_and(|l| l.paid);
        return reported || paid_leave;
    }
    true
}

fn build_day(
    class: &DayClass,
    status: DayStatus,
    entries: Option<&DayEntries>,
    hours: &HourBreakdown,
    paid_holiday_hours: f64,
    leave_hours: f64,
    leave_type: Option<String>,
) -> AttendanceDay {
    AttendanceDay {
        date: class.date,
        day_name: class.date.format("%a").to_string(),
        day_type: class.day_type,
        status,
        is_holiday: class.day_type.is_holiday(),
        holiday_name: class.holiday_name.clone(),
        is_rest_day: class.day_type.is_rest_day(),
        is_sunday: class.is_sunday,
        clock_in: entries.and_then(|e| e.first_in),
        clock_out: entries.and_then(|e| e.last_out),
        entry_ids: entries.map(|e| e.ids.clone()).unwrap_or_default(),
        regular_hours: hours.regular_hours(),
        overtime_hours: hours.overtime_hours(),
        unapproved_overtime_hours: hours.unapproved_overtime_hours(),
        night_diff_hours: hours.night_diff_hours(),
        night_diff_ot_hours: hours.night_diff_overtime_hours(),
        paid_holiday_hours,
        leave_hours,
        leave_type,
    }
}

fn summarize(days: &[AttendanceDay]) -> TimesheetTotals {
    let mut t = TimesheetTotals::default();
    for day in days {
        match day.status {
            DayStatus::Present => t.days_present += 1,
            DayStatus::Incomplete => {
                t.days_present += 1;
                t.days_incomplete += 1;
            }
            DayStatus::Absent => t.days_absent += 1,
            DayStatus::OnLeave => t.days_on_leave += 1,
            DayStatus::RestDay | DayStatus::Holiday => {}
        }

        let paid = day.regular_hours + day.overtime_hours;
        t.regular_hours += day.regular_hours;
        t.overtime_hours += day.overtime_hours;
        t.unapproved_overtime_hours += day.unapproved_overtime_hours;
        t.night_diff_hours += day.night_diff_hours;
        t.night_diff_ot_hours += day.night_diff_ot_hours;
        if day.is_rest_day {
            t.rest_day_hours += paid;
        }
        if day.is_holiday {
            t.holiday_hours_worked += paid;
        }
        t.paid_holiday_hours += day.paid_holiday_hours;
        t.leave_hours += day.leave_hours;
    }

    t.regular_hours = round2(t.regular_hours);
    t.overtime_hours = round2(t.overtime_hours);
    t.unapproved_overtime_hours = round2(t.unapproved_overtime_hours);
    t.night_diff_hours = round2(t.night_diff_hours);
    t.night_diff_ot_hours = round2(t.night_diff_ot_hours);
    t.rest_day_hours = round2(t.rest_day_hours);
    t.holiday_hours_worked = round2(t.holiday_hours_worked);
    t.paid_holiday_hours = round2(t.paid_holiday_hours);
    t.leave_hours = round2(t.leave_hours);
    t
}

/// Hours of a single entry, used to stamp derived columns on clock-out.
pub fn entry_hours(
    span: ClockSpan,
    approved_ot_minutes: i64,
    eligibility: Eligibility,
    rules: &ShiftRules,
) -> HourBreakdown {
    allocate_day(&[span], approved_ot_minutes, eligibility, rules)
}

pub fn total_paid_hours(timesheet: &Timesheet) -> f64 {
    round2(
        timesheet
            .days
            .iter()
            .map(|d| d.regular_hours + d.overtime_hours + d.paid_holiday_hours + d.leave_hours)
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::holiday::HolidayKind;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
    }

    fn entry(id: u64, day: u32, in_h: u32, out_h: Option<u32>) -> ClockEntryInput {
        ClockEntryInput {
            id,
            clock_in: d(day).and_hms_opt(in_h, 0, 0).unwrap(),
            clock_out: out_h.map(|h| d(day).and_hms_opt(h, 0, 0).unwrap()),
        }
    }

    struct Fixture {
        entries: Vec<ClockEntryInput>,
        holidays: Vec<CalendarHoliday>,
        rest: RestDaySchedule,
        overtime: Vec<ApprovedOvertime>,
        leave: Vec<ApprovedLeave>,
        rules: ShiftRules,
        history_start: NaiveDate,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                entries: Vec::new(),
                holidays: Vec::new(),
                rest: RestDaySchedule::sundays(),
                overtime: Vec::new(),
                leave: Vec::new(),
                rules: ShiftRules::default(),
                history_start: d(1),
            }
        }

        fn run(&self) -> Timesheet {
            generate_timesheet(&TimesheetInput {
                employee_id: 7,
                eligibility: Eligibility {
                    overtime: true,
                    night_diff: true,
                },
                period: BiMonthlyPeriod::containing(d(1)),
                entries: &self.entries,
                history_start: self.history_start,
                holidays: &self.holidays,
                rest_days: &self.rest,
                overtime: &self.overtime,
                leave: &self.leave,
                rules: &self.rules,
            })
        }
    }

    fn day(ts: &Timesheet, day: u32) -> &AttendanceDay {
        ts.days.iter().find(|x| x.date == d(day)).unwrap()
    }

    #[test]
    fn empty_period_marks_workdays_absent_and_sundays_rest() {
        let ts = Fixture::new().run();

        assert_eq!(ts.days.len(), 15);
        assert_eq!(day(&ts, 1).day_name, "Mon");
        assert_eq!(day(&ts, 7).status, DayStatus::RestDay);
        assert_eq!(day(&ts, 8).status, DayStatus::Absent);
        // June 1-15 2026 has two Sundays (7th, 14th)
        assert_eq!(ts.totals.days_absent, 13);
        assert_eq!(ts.totals.regular_hours, 0.0);
    }

    #[test]
    fn prior_cutoff_schedule_does_not_cancel_current_sundays() {
        let mut fx = Fixture::new();
        fx.rest = RestDaySchedule::explicit([NaiveDate::from_ymd_opt(2026, 5, 30).unwrap()]);
        fx.history_start = NaiveDate::from_ymd_opt(2026, 5, 25).unwrap();
        let ts = fx.run();

        assert_eq!(day(&ts, 7).status, DayStatus::RestDay);
        assert_eq!(day(&ts, 14).status, DayStatus::RestDay);
        assert_eq!(ts.totals.days_absent, 13);
    }

    #[test]
    fn worked_days_accumulate_hours_and_overtime() {
        let mut f = Fixture::new();
        f.entries = vec![entry(1, 1, 9, Some(18)), entry(2, 2, 9, Some(21))];
        f.overtime = vec![ApprovedOvertime {
            date: d(2),
            minutes: 180,
        }];
        let ts = f.run();

        assert_eq!(day(&ts, 1).status, DayStatus::Present);
        assert_eq!(day(&ts, 1).regular_hours, 8.0);
        assert_eq!(day(&ts, 2).overtime_hours, 3.0);
        assert_eq!(day(&ts, 2).entry_ids, vec![2]);
        assert_eq!(ts.totals.days_present, 2);
        assert_eq!(ts.totals.regular_hours, 16.0);
        assert_eq!(ts.totals.overtime_hours, 3.0);
    }

    #[test]
    fn entries_outside_the_period_are_ignored() {
        let mut f = Fixture::new();
        f.entries = vec![ClockEntryInput {
            id: 9,
            // same day-of-month, wrong year
            clock_in: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            clock_out: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(18, 0, 0),
        }];
        let ts = f.run();

        assert_eq!(day(&ts, 2).status, DayStatus::Absent);
        assert_eq!(ts.totals.days_present, 0);
    }

    #[test]
    fn open_entry_marks_day_incomplete() {
        let mut f = Fixture::new();
        f.entries = vec![entry(3, 3, 9, None)];
        let ts = f.run();

        let wed = day(&ts, 3);
        assert_eq!(wed.status, DayStatus::Incomplete);
        assert_eq!(wed.clock_out, None);
        assert_eq!(ts.totals.days_incomplete, 1);
    }

    #[test]
    fn worked_rest_day_counts_rest_day_hours() {
        let mut f = Fixture::new();
        f.entries = vec![entry(1, 7, 9, Some(18))];
        let ts = f.run();

        let sunday = day(&ts, 7);
        assert_eq!(sunday.day_type, DayType::RestDay);
        assert_eq!(sunday.status, DayStatus::Present);
        assert_eq!(ts.totals.rest_day_hours, 8.0);
    }

    #[test]
    fn regular_holiday_paid_when_preceding_workday_attended() {
        let mut f = Fixture::new();
        f.holidays = vec![CalendarHoliday {
            date: d(12),
            name: "Independence Day".to_string(),
            kind: HolidayKind::Regular,
        }];
        f.entries = vec![entry(1, 11, 9, Some(18))];
        let ts = f.run();

        let holiday = day(&ts, 12);
        assert_eq!(holiday.status, DayStatus::Holiday);
        assert!(holiday.is_holiday);
        assert_eq!(holiday.paid_holiday_hours, 8.0);
    }

    #[test]
    fn regular_holiday_unpaid_after_absence() {
        let mut f = Fixture::new();
        f.holidays = vec![CalendarHoliday {
            date: d(12),
            name: "Independence Day".to_string(),
            kind: HolidayKind::Regular,
        }];
        let ts = f.run();
        assert_eq!(day(&ts, 12).paid_holiday_hours, 0.0);
    }

    #[test]
    fn holiday_before_history_gets_benefit_of_the_doubt() {
        let mut f = Fixture::new();
        f.holidays = vec![CalendarHoliday {
            date: d(1),
            name: "Founding Day".to_string(),
            kind: HolidayKind::Regular,
        }];
        let ts = f.run();
        assert_eq!(day(&ts, 1).paid_holiday_hours, 8.0);
    }

    #[test]
    fn special_holiday_unworked_is_unpaid() {
        let mut f = Fixture::new();
        f.holidays = vec![CalendarHoliday {
            date: d(5),
            name: "Special Day".to_string(),
            kind: HolidayKind::SpecialNonWorking,
        }];
        f.entries = vec![entry(1, 4, 9, Some(18))];
        let ts = f.run();

        let special = day(&ts, 5);
        assert_eq!(special.status, DayStatus::Holiday);
        assert_eq!(special.paid_holiday_hours, 0.0);
    }

    #[test]
    fn approved_leave_covers_working_days_only() {
        let mut f = Fixture::new();
        f.leave = vec![ApprovedLeave {
            start: d(6),
            end: d(8),
            leave_type: "annual".to_string(),
            paid: true,
        }];
        let ts = f.run();

        assert_eq!(day(&ts, 6).status, DayStatus::OnLeave);
        assert_eq!(day(&ts, 6).leave_hours, 8.0);
        // Sunday inside the leave stays a rest day
        assert_eq!(day(&ts, 7).status, DayStatus::RestDay);
        assert_eq!(ts.totals.days_on_leave, 2);
        assert_eq!(ts.totals.leave_hours, 16.0);
    }

    #[test]
    fn generation_is_deterministic() {
        let mut f = Fixture::new();
        f.entries = vec![entry(1, 1, 9, Some(18)), entry(2, 2, 22, None)];
        assert_eq!(f.run(), f.run());
    }
}
