use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub can_access_salary: bool,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "hr@company.ph")]
    pub email: String,
    #[schema(example = "Maria Santos")]
    pub full_name: String,
    #[schema(example = "hr")]
    pub role: String,
    pub is_active: bool,
    pub can_access_salary: bool,
    #[schema(example = "2026-01-01T08:00:00", value_type = Option<String>)]
    pub last_login_at: Option<NaiveDateTime>,
}
