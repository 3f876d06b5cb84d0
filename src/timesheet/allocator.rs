use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Working-time rules applied to every day of a timesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftRules {
    pub standard_minutes: i64,
    pub break_minutes: i64,
    /// A break is only deducted once the day's worked time exceeds this.
    pub break_after_minutes: i64,
    pub night_start_hour: u32,
    pub night_end_hour: u32,
}

impl Default for ShiftRules {
    fn default() -> Self {
        Self {
            standard_minutes: 8 * 60,
            break_minutes: 60,
            break_after_minutes: 5 * 60,
            night_start_hour: 22,
            night_end_hour: 6,
        }
    }
}

impl ShiftRules {
    pub fn standard_hours(&self) -> f64 {
        self.standard_minutes as f64 / 60.0
    }

    fn is_night(&self, at: NaiveDateTime) -> bool {
        let hour = at.hour();
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }
}

/// A closed clock-in/clock-out pair in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSpan {
    pub clock_in: NaiveDateTime,
    pub clock_out: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub overtime: bool,
    pub night_diff: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBreakdown {
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub regular_minutes: i64,
    pub overtime_minutes: i64,
    pub unapproved_overtime_minutes: i64,
    pub night_regular_minutes: i64,
    pub night_overtime_minutes: i64,
}

pub fn minutes_to_hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

impl HourBreakdown {
    pub fn regular_hours(&self) -> f64 {
        minutes_to_hours(self.regular_minutes)
    }

    pub fn overtime_hours(&self) -> f64 {
        minutes_to_hours(self.overtime_minutes)
    }

    pub fn unapproved_overtime_hours(&self) -> f64 {
        minutes_to_hours(self.unapproved_overtime_minutes)
    }

    pub fn night_diff_hours(&self) -> f64 {
        minutes_to_hours(self.night_regular_minutes)
    }

    pub fn night_diff_overtime_hours(&self) -> f64 {
        minutes_to_hours(self.night_overtime_minutes)
    }

    /// Hours that count as paid work (regular plus approved overtime).
    pub fn paid_hours(&self) -> f64 {
        minutes_to_hours(self.regular_minutes + self.overtime_minutes)
    }
}

/// Sorts spans and folds overlapping or duplicated ones together so the same
/// minute is never counted twice.
fn merge_spans(spans: &[ClockSpan]) -> Vec<ClockSpan> {
    let mut sorted: Vec<ClockSpan> = spans
        .iter()
        .copied()
        .filter(|s| s.clock_out > s.clock_in)
        .collect();
    sorted.sort_by_key(|s| s.clock_in);

    let mut merged: Vec<ClockSpan> = Vec::with_capacity(sorted.len());
    for span in sorted {
        match merged.last_mut() {
            Some(last) if span.clock_in <= last.clock_out => {
                last.clock_out = last.clock_out.max(span.clock_out);
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// Splits one day's worked time into regular, overtime and night buckets.
///
/// Time is allocated in clock order: the first `standard + break` minutes are
/// regular, later minutes are overtime. Only `approved_ot_minutes` of overtime
/// are paid, and only for overtime-eligible employees; the rest is reported as
/// unapproved. The break comes off daytime regular minutes first, less any
/// gap the employee already spent clocked out between spans.
pub fn allocate_day(
    spans: &[ClockSpan],
    approved_ot_minutes: i64,
    eligibility: Eligibility,
    rules: &ShiftRules,
) -> HourBreakdown {
    let merged = merge_spans(spans);

    let worked: i64 = merged
        .iter()
        .map(|s| (s.clock_out - s.clock_in).num_minutes())
        .sum();
    if worked == 0 {
        return HourBreakdown::default();
    }

    // time already spent clocked out between spans counts toward the break
    let gaps: i64 = merged
        .windows(2)
        .map(|pair| (pair[1].clock_in - pair[0].clock_out).num_minutes())
        .sum();
    let break_minutes = if worked > rules.break_after_minutes {
        (rules.break_minutes - gaps).clamp(0, worked)
    } else {
        0
    };
    let regular_capacity = rules.standard_minutes + break_minutes;
    let paid_ot_cap = if eligibility.overtime {
        approved_ot_minutes.max(0)
    } else {
        0
    };

    let mut regular_day = 0i64;
    let mut regular_night = 0i64;
    let mut ot_day = 0i64;
    let mut ot_night = 0i64;
    let mut unapproved = 0i64;
    let mut position = 0i64;

    for span in &merged {
        let minutes = (span.clock_out - span.clock_in).num_minutes();
        for offset in 0..minutes {
            let at = span.clock_in + Duration::minutes(offset);
            let night = rules.is_night(at);

            if position < regular_capacity {
                if night {
                    regular_night += 1;
                } else {
                    regular_day += 1;
                }
            } else if position - regular_capacity < paid_ot_cap {
                if night {
                    ot_night += 1;
                } else {
                    ot_day += 1;
                }
            } else {
                unapproved += 1;
            }
            position += 1;
        }
    }

    let from_day = break_minutes.min(regular_day);
    let from_night = (break_minutes - from_day).min(regular_night);
    regular_day -= from_day;
    regular_night -= from_night;

    let (night_regular, night_overtime) = if eligibility.night_diff {
        (regular_night, ot_night)
    } else {
        (0, 0)
    };

    HourBreakdown {
        worked_minutes: worked,
        break_minutes,
        regular_minutes: regular_day + regular_night,
        overtime_minutes: ot_day + ot_night,
        unapproved_overtime_minutes: unapproved,
        night_regular_minutes: night_regular,
        night_overtime_minutes: night_overtime,
    }
}
