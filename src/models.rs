use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Staff user (email login) or employee (employee-code login).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Employee,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "hr@company.ph")]
    pub email: String,
    #[schema(example = "s3cretPass")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EmployeeLoginReq {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "s3cretPass")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordReq {
    pub current_password: String,
    #[schema(example = "n3wPassword")]
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "hr")]
    pub role: String,
    /// True on an employee's first successful login.
    pub first_login: bool,
}

/// Credentials row used by the employee login.
#[derive(FromRow)]
pub struct EmployeeCredentials {
    pub id: u64,
    pub employee_code: String,
    pub password: String,
    pub is_active: bool,
    pub first_login_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Email for users, employee code for employees
    pub sub: String,
    pub kind: PrincipalKind,
    pub principal_id: u64,
    pub role: String,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only for employee principals
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
