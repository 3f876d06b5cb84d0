use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::model::holiday::HolidayKind;

use super::period::BiMonthlyPeriod;

/// Pay classification of a calendar day for one employee.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayType {
    RegularDay,
    RestDay,
    SpecialHoliday,
    RegularHoliday,
    RestDaySpecialHoliday,
    RestDayRegularHoliday,
}

impl DayType {
    pub fn is_rest_day(self) -> bool {
        matches!(
            self,
            DayType::RestDay | DayType::RestDaySpecialHoliday | DayType::RestDayRegularHoliday
        )
    }

    pub fn is_holiday(self) -> bool {
        self.holiday_kind().is_some()
    }

    pub fn holiday_kind(self) -> Option<HolidayKind> {
        match self {
            DayType::SpecialHoliday | DayType::RestDaySpecialHoliday => {
                Some(HolidayKind::SpecialNonWorking)
            }
            DayType::RegularHoliday | DayType::RestDayRegularHoliday => Some(HolidayKind::Regular),
            DayType::RegularDay | DayType::RestDay => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarHoliday {
    pub date: NaiveDate,
    pub name: String,
    pub kind: HolidayKind,
}

/// Rest days for one employee. Each payroll cutoff is decided on its own: a
/// cutoff with schedule rows rests only on those dates, any other cutoff rests
/// on Sundays.
#[derive(Debug, Clone, Default)]
pub struct RestDaySchedule {
    explicit: HashSet<NaiveDate>,
    scheduled: HashSet<BiMonthlyPeriod>,
}

impl RestDaySchedule {
    pub fn sundays() -> Self {
        Self::default()
    }

    /// Schedule built from stored rest-day rows. Every cutoff holding at least
    /// one row switches to the explicit dates.
    pub fn explicit(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let explicit: HashSet<_> = dates.into_iter().collect();
        let scheduled = explicit.iter().map(|d| BiMonthlyPeriod::containing(*d)).collect();
        Self { explicit, scheduled }
    }

    pub fn is_scheduled(&self, period: &BiMonthlyPeriod) -> bool {
        self.scheduled.contains(period)
    }

    pub fn is_rest_day(&self, date: NaiveDate) -> bool {
        if self.scheduled.contains(&BiMonthlyPeriod::containing(date)) {
            self.explicit.contains(&date)
        } else {
            date.weekday() == Weekday::Sun
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayClass {
    pub date: NaiveDate,
    pub day_type: DayType,
    pub is_sunday: bool,
    pub holiday_name: Option<String>,
}

impl DayClass {
    /// A day the employee is normally expected to report for.
    pub fn is_working_day(&self) -> bool {
        self.day_type == DayType::RegularDay
    }
}

pub struct DayClassifier<'a> {
    holidays: HashMap<NaiveDate, &'a CalendarHoliday>,
    rest_days: &'a RestDaySchedule,
}

impl<'a> DayClassifier<'a> {
    pub fn new(holidays: &'a [CalendarHoliday], rest_days: &'a RestDaySchedule) -> Self {
        let mut by_date: HashMap<NaiveDate, &'a CalendarHoliday> = HashMap::new();
        for holiday in holidays {
            by_date
                .entry(holiday.date)
                .and_modify(|current| {
                    // a regular holiday outranks a special one on the same date
                    if current.kind != HolidayKind::Regular && holiday.kind == HolidayKind::Regular {
                        *current = holiday;
                    }
                })
                .or_insert(holiday);
        }
        Self {
            holidays: by_date,
            rest_days,
        }
    }

    pub fn classify(&self, date: NaiveDate) -> DayClass {
        let rest = self.rest_days.is_rest_day(date);
        let holiday = self.holidays.get(&date);

        let day_type = match (holiday.map(|h| h.kind), rest) {
            (None, false) => DayType::RegularDay,
            (None, true) => DayType::RestDay,
            (Some(HolidayKind::SpecialNonWorking), false) => DayType::SpecialHoliday,
            (Some(HolidayKind::SpecialNonWorking), true) => DayType::RestDaySpecialHoliday,
            (Some(HolidayKind::Regular), false) => DayType::RegularHoliday,
            (Some(HolidayKind::Regular), true) => DayType::RestDayRegularHoliday,
        };

        DayClass {
            date,
            day_type,
            is_sunday: date.weekday() == Weekday::Sun,
            holiday_name: holiday.map(|h| h.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        // June 2026: the 7th, 14th, 21st and 28th are Sundays
        NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
    }

    fn holiday(day: u32, name: &str, kind: HolidayKind) -> CalendarHoliday {
        CalendarHoliday {
            date: d(day),
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn sundays_are_rest_days_without_a_schedule() {
        let rest = RestDaySchedule::sundays();
        let classifier = DayClassifier::new(&[], &rest);

        let sunday = classifier.classify(d(7));
        assert_eq!(sunday.day_type, DayType::RestDay);
        assert!(sunday.is_sunday);
        assert_eq!(classifier.classify(d(8)).day_type, DayType::RegularDay);
    }

    #[test]
    fn explicit_schedule_replaces_sunday_default() {
        let rest = RestDaySchedule::explicit([d(10)]);
        let classifier = DayClassifier::new(&[], &rest);

        assert_eq!(classifier.classify(d(7)).day_type, DayType::RegularDay);
        assert_eq!(classifier.classify(d(10)).day_type, DayType::RestDay);
    }

    #[test]
    fn schedule_in_one_cutoff_leaves_neighbours_on_sundays() {
        // only row is Saturday May 30, in the second May cutoff
        let may_30 = NaiveDate::from_ymd_opt(2026, 5, 30).unwrap();
        let may_31 = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
        let rest = RestDaySchedule::explicit([may_30]);
        let classifier = DayClassifier::new(&[], &rest);

        assert_eq!(classifier.classify(may_30).day_type, DayType::RestDay);
        assert_eq!(classifier.classify(may_31).day_type, DayType::RegularDay);
        assert_eq!(classifier.classify(d(7)).day_type, DayType::RestDay);
        assert_eq!(classifier.classify(d(14)).day_type, DayType::RestDay);
        assert_eq!(classifier.classify(d(6)).day_type, DayType::RegularDay);
        assert!(!rest.is_scheduled(&BiMonthlyPeriod::containing(d(1))));
    }

    #[test]
    fn holiday_on_rest_day_combines() {
        let holidays = [
            holiday(12, "Independence Day", HolidayKind::Regular),
            holiday(14, "Local Special Day", HolidayKind::SpecialNonWorking),
        ];
        let rest = RestDaySchedule::sundays();
        let classifier = DayClassifier::new(&holidays, &rest);

        let independence = classifier.classify(d(12));
        assert_eq!(independence.day_type, DayType::RegularHoliday);
        assert_eq!(independence.holiday_name.as_deref(), Some("Independence Day"));
        assert_eq!(
            classifier.classify(d(14)).day_type,
            DayType::RestDaySpecialHoliday
        );
    }

    #[test]
    fn regular_holiday_outranks_special_on_same_date() {
        let holidays = [
            holiday(12, "Special", HolidayKind::SpecialNonWorking),
            holiday(12, "Regular", HolidayKind::Regular),
        ];
        let rest = RestDaySchedule::sundays();
        let classifier = DayClassifier::new(&holidays, &rest);

        let day = classifier.classify(d(12));
        assert_eq!(day.day_type, DayType::RegularHoliday);
        assert_eq!(day.holiday_name.as_deref(), Some("Regular"));
    }

    #[test]
    fn day_type_round_trips_through_strings() {
        assert_eq!(DayType::RestDayRegularHoliday.as_ref(), "rest_day_regular_holiday");
        assert_eq!(
            "special_holiday".parse::<DayType>().unwrap(),
            DayType::SpecialHoliday
        );
    }
}
