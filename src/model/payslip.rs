use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::types::Json;

use crate::payroll::calculator::PayBreakdown;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Payslip {
    pub id: u64,
    pub employee_id: u64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub gross_pay: f64,
    pub total_deductions: f64,
    pub net_pay: f64,
    pub breakdown: Json<PayBreakdown>,
    pub created_at: Option<NaiveDateTime>,
}
