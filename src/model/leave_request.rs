use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Emergency,
    Unpaid,
}

impl LeaveType {
    /// Paid leave consumes credits and is paid in the timesheet.
    pub fn is_paid(self) -> bool {
        !matches!(self, LeaveType::Unpaid)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub status: String,
}

impl LeaveRequest {
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Remaining credits of one leave type for one year.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveCredit {
    #[schema(example = "annual")]
    pub leave_type: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 5.0)]
    pub total_days: f64,
    #[schema(example = 2.0)]
    pub used_days: f64,
    #[schema(example = 3.0)]
    pub remaining_days: f64,
}

impl LeaveCredit {
    pub fn new(leave_type: String, year: i32, total_days: f64, used_days: f64) -> Self {
        Self {
            leave_type,
            year,
            total_days,
            used_days,
            remaining_days: (total_days - used_days).max(0.0),
        }
    }
}

/// Default yearly entitlement written by the balance refresh
/// (service incentive leave for annual, company policy for the rest).
pub fn default_entitlement(leave_type: LeaveType) -> f64 {
    match leave_type {
        LeaveType::Annual => 5.0,
        LeaveType::Sick => 5.0,
        LeaveType::Emergency => 3.0,
        LeaveType::Unpaid => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_days_are_inclusive() {
        let leave = LeaveRequest {
            id: 1,
            employee_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 3).unwrap(),
            leave_type: "sick".to_string(),
            status: "approved".to_string(),
        };
        assert_eq!(leave.days(), 3);
    }

    #[test]
    fn remaining_credit_never_negative() {
        let credit = LeaveCredit::new("annual".to_string(), 2026, 5.0, 7.0);
        assert_eq!(credit.remaining_days, 0.0);
        assert!(!LeaveType::Unpaid.is_paid());
    }
}
