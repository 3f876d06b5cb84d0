//! Payslip generation. A payslip is computed from the recomputed timesheet,
//! never from stored snapshots, and its loan amortisations are written in the
//! same transaction as the payslip row.

use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlPool, types::Json};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{loans::LOAN_COLUMNS, timesheet::period_for},
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        loan::{LOAN_ACTIVE, LOAN_PAID, Loan},
        payslip::Payslip,
    },
    payroll::{DeductionInput, PayRates, compute_payslip},
    timesheet::source::load_sources,
    utils::db_utils::{SqlValue, bind_filters},
};

const PAYSLIP_COLUMNS: &str = "id, employee_id, period_start, period_end, gross_pay, \
     total_deductions, net_pay, breakdown, created_at";

/// Balances below this are treated as settled.
const SETTLED_EPSILON: f64 = 0.005;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GeneratePayslip {
    #[schema(example = 12)]
    pub employee_id: u64,
    /// Any date inside the cutoff; defaults to the current one
    #[schema(example = "2026-06-10", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Contributions and tax computed outside this service
    #[serde(default)]
    pub deductions: DeductionInput,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PayslipFilter {
    pub employee_id: Option<u64>,
    /// Period start (1st or 16th)
    #[param(value_type = Option<String>)]
    pub period_start: Option<NaiveDate>,
}

/// Generate a payslip (salary access)
#[utoipa::path(
    post,
    path = "/api/payslips",
    request_body = GeneratePayslip,
    responses(
        (status = 201, description = "Payslip created", body = Object, example = json!({
            "message": "Payslip generated",
            "id": 40,
            "period_start": "2026-06-01",
            "period_end": "2026-06-15",
            "breakdown": {
                "daily_rate": 800.0,
                "hourly_rate": 100.0,
                "earnings": [{ "kind": "regular", "day_type": "regular_day", "hours": 80.0, "multiplier": 1.0, "amount": 8000.0 }],
                "deductions": [{ "label": "loan:company", "loan_id": 3, "amount": 1000.0 }],
                "gross_pay": 8000.0,
                "total_deductions": 1000.0,
                "net_pay": 7000.0
            }
        })),
        (status = 400, description = "Negative deductions, or deductions above gross pay"),
        (status = 403, description = "Salary access required"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payslip already exists for the period")
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn generate_payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<GeneratePayslip>,
) -> actix_web::Result<impl Responder> {
    auth.require_salary_access()?;
    let GeneratePayslip {
        employee_id,
        date,
        deductions,
    } = payload.into_inner();

    let negative = [
        deductions.sss,
        deductions.philhealth,
        deductions.pagibig,
        deductions.withholding_tax,
    ]
    .into_iter()
    .chain(deductions.other.iter().map(|d| d.amount))
    .any(|amount| !amount.is_finite() || amount < 0.0);
    if negative {
        return Err(AppError::validation("Deductions must be non-negative amounts").into());
    }

    let rules = config.shift_rules();
    let period = period_for(date, &config);
    let sources = load_sources(pool.get_ref(), employee_id, period).await?;
    let timesheet = sources.generate(&rules);
    let rates = PayRates::from_daily(sources.employee.daily_rate, rules.standard_hours());

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    let existing = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM payslips WHERE employee_id = ? AND period_start = ?",
    )
    .bind(employee_id)
    .bind(period.start)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::Db)?;
    if existing.is_some() {
        return Err(AppError::conflict(format!("Payslip already exists for {period}")).into());
    }

    let sql = format!(
        "SELECT {LOAN_COLUMNS} FROM loans \
         WHERE employee_id = ? AND status = ? AND start_date <= ? ORDER BY id FOR UPDATE"
    );
    let loans = sqlx::query_as::<_, Loan>(&sql)
        .bind(employee_id)
        .bind(LOAN_ACTIVE)
        .bind(period.end)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::Db)?;

    let breakdown = compute_payslip(&timesheet, &rates, &deductions, &loans)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO payslips
        (employee_id, period_start, period_end, gross_pay, total_deductions, net_pay, breakdown)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(period.start)
    .bind(period.end)
    .bind(breakdown.gross_pay)
    .bind(breakdown.total_deductions)
    .bind(breakdown.net_pay)
    .bind(Json(&breakdown))
    .execute(&mut *tx)
    .await;

    let payslip_id = match inserted {
        Ok(done) => done.last_insert_id(),
        Err(e) if AppError::is_duplicate_key(&e) => {
            return Err(AppError::conflict(format!("Payslip already exists for {period}")).into());
        }
        Err(e) => {
            error!(error = %e, employee_id, %period, "Failed to insert payslip");
            return Err(AppError::Db(e).into());
        }
    };

    for (loan_id, amount) in breakdown.loan_payments() {
        sqlx::query("INSERT INTO loan_payments (loan_id, payslip_id, amount) VALUES (?, ?, ?)")
            .bind(loan_id)
            .bind(payslip_id)
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Db)?;

        sqlx::query(
            r#"
            UPDATE loans
            SET balance = GREATEST(balance - ?, 0),
                status = IF(balance <= ?, ?, status)
            WHERE id = ?
            "#,
        )
        .bind(amount)
        .bind(SETTLED_EPSILON)
        .bind(LOAN_PAID)
        .bind(loan_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, loan_id, "Failed to amortise loan");
            AppError::Db(e)
        })?;
    }

    tx.commit().await.map_err(AppError::Db)?;

    info!(
        employee_id,
        payslip_id,
        %period,
        gross = breakdown.gross_pay,
        net = breakdown.net_pay,
        "Payslip generated"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Payslip generated",
        "id": payslip_id,
        "period_start": period.start,
        "period_end": period.end,
        "breakdown": breakdown
    })))
}

/// List payslips (salary access)
#[utoipa::path(
    get,
    path = "/api/payslips",
    params(PayslipFilter),
    responses(
        (status = 200, description = "Payslips", body = Object),
        (status = 403, description = "Salary access required")
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn list_payslips(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayslipFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_salary_access()?;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<SqlValue> = Vec::new();
    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }
    if let Some(start) = query.period_start {
        where_sql.push_str(" AND period_start = ?");
        args.push(SqlValue::Date(start));
    }

    let sql = format!(
        "SELECT {PAYSLIP_COLUMNS} FROM payslips{where_sql} ORDER BY period_start DESC, employee_id LIMIT 500"
    );
    let payslips = bind_filters(sqlx::query_as::<_, Payslip>(&sql), &args)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch payslips");
            AppError::Db(e)
        })?;

    Ok(HttpResponse::Ok().json(payslips))
}

/// Payslip details (salary access)
#[utoipa::path(
    get,
    path = "/api/payslips/{payslip_id}",
    params(("payslip_id", Path, description = "Payslip ID")),
    responses(
        (status = 200, description = "Payslip with breakdown", body = Object),
        (status = 403, description = "Salary access required"),
        (status = 404, description = "Payslip not found")
    ),
    tag = "Payroll",
    security(("bearer_auth" = []))
)]
pub async fn get_payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_salary_access()?;
    let payslip_id = path.into_inner();

    let sql = format!("SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE id = ?");
    let payslip = sqlx::query_as::<_, Payslip>(&sql)
        .bind(payslip_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, payslip_id, "Failed to fetch payslip");
            AppError::Db(e)
        })?
        .ok_or(AppError::NotFound("Payslip"))?;

    Ok(HttpResponse::Ok().json(payslip))
}
