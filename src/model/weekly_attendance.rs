use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::types::Json;

use crate::timesheet::AttendanceDay;

/// Persisted snapshot of a generated timesheet for one (employee, period).
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct WeeklyAttendance {
    pub id: u64,
    pub employee_id: u64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub attendance_data: Json<Vec<AttendanceDay>>,
    pub total_regular_hours: f64,
    pub total_overtime_hours: f64,
    pub total_night_diff_hours: f64,
    pub generated_at: NaiveDateTime,
}
