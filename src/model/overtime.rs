use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OvertimeRequest {
    #[schema(example = 1)]
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-06-02", value_type = String)]
    pub ot_date: NaiveDate,
    #[schema(example = "18:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "21:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 3.0)]
    pub hours: f64,
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    pub stage1_by: Option<u64>,
    pub stage2_by: Option<u64>,
    pub final_by: Option<u64>,
    pub rejected_by: Option<u64>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = Option<String>)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OvertimeGroup {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Operations")]
    pub name: String,
    /// Staff user who gives the first approval for the group.
    pub approver_id: Option<u64>,
    /// Staff user with read-only access to the group's requests.
    pub viewer_id: Option<u64>,
}

/// Hours between two clock times; an end before the start runs past midnight.
pub fn requested_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    let mut minutes = (end - start).num_minutes();
    if minutes <= 0 {
        minutes += 24 * 60;
    }
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn requested_hours_handles_midnight() {
        assert_eq!(requested_hours(t(18, 0), t(21, 30)), 3.5);
        assert_eq!(requested_hours(t(22, 0), t(2, 0)), 4.0);
    }
}
