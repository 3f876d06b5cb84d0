use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct FundRequest {
    #[schema(example = 1)]
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = 2500.0)]
    pub amount: f64,
    #[schema(example = "Client site transportation")]
    pub purpose: String,
    #[schema(example = "2026-06-10", value_type = Option<String>)]
    pub needed_by: Option<NaiveDate>,
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
