use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::loan::{LOAN_ACTIVE, Loan},
    timesheet::source::load_employee,
    utils::db_utils::{SqlValue, bind_filters},
};

pub const LOAN_COLUMNS: &str =
    "id, employee_id, loan_type, principal, per_cutoff_deduction, balance, start_date, status, created_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "company")]
    pub loan_type: String,
    #[schema(example = 10000.0)]
    pub principal: f64,
    #[schema(example = 1000.0)]
    pub per_cutoff_deduction: f64,
    /// First cutoff the loan is deducted in
    #[schema(example = "2026-06-01", value_type = String)]
    pub start_date: NaiveDate,
}

impl CreateLoan {
    fn validate(&self) -> Result<(), AppError> {
        if self.loan_type.trim().is_empty() {
            return Err(AppError::validation("loan_type is required"));
        }
        if !self.principal.is_finite() || self.principal <= 0.0 {
            return Err(AppError::validation("principal must be positive"));
        }
        if !self.per_cutoff_deduction.is_finite() || self.per_cutoff_deduction <= 0.0 {
            return Err(AppError::validation("per_cutoff_deduction must be positive"));
        }
        if self.per_cutoff_deduction > self.principal {
            return Err(AppError::validation(
                "per_cutoff_deduction cannot exceed the principal",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LoanFilter {
    /// Salary-access staff only; employees always see their own
    pub employee_id: Option<u64>,
    /// `active` or `paid`
    pub status: Option<String>,
}

/// Grant a loan (salary access)
#[utoipa::path(
    post,
    path = "/api/loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Object, example = json!({
            "message": "Loan created",
            "id": 3
        })),
        (status = 400, description = "Invalid amounts"),
        (status = 403, description = "Salary access required"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn create_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLoan>,
) -> actix_web::Result<impl Responder> {
    auth.require_salary_access()?;
    payload.validate()?;
    load_employee(pool.get_ref(), payload.employee_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO loans (employee_id, loan_type, principal, per_cutoff_deduction, balance, start_date, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.loan_type.trim())
    .bind(payload.principal)
    .bind(payload.per_cutoff_deduction)
    .bind(payload.principal)
    .bind(payload.start_date)
    .bind(LOAN_ACTIVE)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = payload.employee_id, "Failed to create loan");
        AppError::Db(e)
    })?;

    info!(
        loan_id = result.last_insert_id(),
        employee_id = payload.employee_id,
        principal = payload.principal,
        "Loan created"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Loan created",
        "id": result.last_insert_id()
    })))
}

/// List loans
#[utoipa::path(
    get,
    path = "/api/loans",
    params(LoanFilter),
    responses(
        (status = 200, description = "Loans", body = [Loan]),
        (status = 403, description = "Salary access required")
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn list_loans(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LoanFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = match auth.employee_id() {
        Some(own) => Some(own),
        None => {
            auth.require_salary_access()?;
            query.employee_id
        }
    };

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<SqlValue> = Vec::new();
    if let Some(employee_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    let sql = format!("SELECT {LOAN_COLUMNS} FROM loans{where_sql} ORDER BY id DESC");
    let loans = bind_filters(sqlx::query_as::<_, Loan>(&sql), &args)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch loans");
            AppError::Db(e)
        })?;

    Ok(HttpResponse::Ok().json(loans))
}

/// Loan details
#[utoipa::path(
    get,
    path = "/api/loans/{loan_id}",
    params(("loan_id", Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan", body = Loan),
        (status = 403, description = "Salary access required"),
        (status = 404, description = "Loan not found")
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn get_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    if !auth.is_employee() {
        auth.require_salary_access()?;
    }
    let loan_id = path.into_inner();

    let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?");
    let loan = sqlx::query_as::<_, Loan>(&sql)
        .bind(loan_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, loan_id, "Failed to fetch loan");
            AppError::Db(e)
        })?
        .filter(|l| auth.employee_id().is_none_or(|own| own == l.employee_id))
        .ok_or(AppError::NotFound("Loan"))?;

    Ok(HttpResponse::Ok().json(loan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installment_cannot_exceed_principal() {
        let mut loan = CreateLoan {
            employee_id: 1,
            loan_type: "company".to_string(),
            principal: 5000.0,
            per_cutoff_deduction: 500.0,
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        };
        assert!(loan.validate().is_ok());

        loan.per_cutoff_deduction = 6000.0;
        assert!(loan.validate().is_err());

        loan.per_cutoff_deduction = 500.0;
        loan.principal = -1.0;
        assert!(loan.validate().is_err());
    }
}
