use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::timesheet::generator::ClockEntryInput;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TimeClockEntry {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "2026-06-01T08:58:00", value_type = String)]
    pub clock_in_time: NaiveDateTime,
    #[schema(example = "2026-06-01T18:02:00", value_type = Option<String>)]
    pub clock_out_time: Option<NaiveDateTime>,
    pub regular_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub night_diff_hours: Option<f64>,
    #[schema(example = "completed")]
    pub status: String,
    pub is_manual_entry: bool,
    pub office_location_id: Option<u64>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub notes: Option<String>,
}

impl From<&TimeClockEntry> for ClockEntryInput {
    fn from(entry: &TimeClockEntry) -> Self {
        ClockEntryInput {
            id: entry.id,
            clock_in: entry.clock_in_time,
            clock_out: entry.clock_out_time,
        }
    }
}

pub const STATUS_CLOCKED_IN: &str = "clocked_in";
pub const STATUS_COMPLETED: &str = "completed";
