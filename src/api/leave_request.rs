use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::{AppError, AppResult},
    model::leave_request::{LeaveCredit, LeaveType, default_entitlement},
    timesheet::{
        classifier::DayClassifier,
        source::{load_holidays, load_rest_schedule},
    },
    utils::db_utils::{SqlValue, bind_count_filters, bind_filters},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool, prelude::FromRow};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

const LEAVE_COLUMNS: &str =
    "id, employee_id, start_date, end_date, leave_type, reason, status, decided_by, created_at";

/// Longest single leave request, in calendar days. Credits are charged in
/// working days.
const MAX_LEAVE_DAYS: i64 = 60;

const CREDITED_TYPES: [LeaveType; 3] = [LeaveType::Annual, LeaveType::Sick, LeaveType::Emergency];

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    #[schema(example = "Medical check-up")]
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "data": [
        {
            "id": 1,
            "employee_id": 1000,
            "start_date": "2026-01-01",
            "end_date": "2026-01-03",
            "leave_type": "sick",
            "reason": null,
            "status": "pending",
            "decided_by": null,
            "created_at": "2026-01-01T00:00:00"
        }
    ],
    "page": 1,
    "per_page": 10,
    "total": 1
}))]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID (staff only)
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u32>,
}

#[derive(Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: String,
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    /// Staff user who approved or rejected the request
    pub decided_by: Option<u64>,
    #[schema(example = "2026-01-01T00:00:00", value_type = String)]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CreditQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshCredits {
    #[schema(example = 2026)]
    pub year: Option<i32>,
    /// Only this employee; every active employee when omitted
    pub employee_id: Option<u64>,
}

fn current_year(config: &Config) -> i32 {
    Utc::now().with_timezone(&config.local_offset()).year()
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Working days in `start..=end`. Rest days and holidays cost no credit,
/// matching the days the timesheet pays as leave.
fn chargeable_days(classifier: &DayClassifier<'_>, start: NaiveDate, end: NaiveDate) -> i64 {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| classifier.classify(*d).is_working_day())
        .count() as i64
}

/// Chargeable days of each leave in `ranges`, against the employee's own
/// holidays and rest days.
async fn count_chargeable(
    conn: &mut MySqlConnection,
    employee_id: u64,
    ranges: &[(NaiveDate, NaiveDate)],
) -> AppResult<Vec<i64>> {
    let (Some(from), Some(to)) = (
        ranges.iter().map(|(s, _)| *s).min(),
        ranges.iter().map(|(_, e)| *e).max(),
    ) else {
        return Ok(Vec::new());
    };
    let holidays = load_holidays(&mut *conn, from, to).await?;
    let rest_days = load_rest_schedule(&mut *conn, employee_id, from, to).await?;
    let classifier = DayClassifier::new(&holidays, &rest_days);

    Ok(ranges
        .iter()
        .map(|(start, end)| chargeable_days(&classifier, *start, *end))
        .collect())
}

/// Approved chargeable days per leave type, for leaves starting in `year`.
async fn used_days(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
) -> AppResult<Vec<(String, i64)>> {
    let approved = sqlx::query_as::<_, (String, NaiveDate, NaiveDate)>(
        r#"
        SELECT leave_type, start_date, end_date
        FROM leave_requests
        WHERE employee_id = ? AND status = 'approved' AND YEAR(start_date) = ?
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .fetch_all(&mut *conn)
    .await?;

    let ranges: Vec<_> = approved.iter().map(|(_, s, e)| (*s, *e)).collect();
    let counts = count_chargeable(conn, employee_id, &ranges).await?;

    let mut used: Vec<(String, i64)> = Vec::new();
    for ((leave_type, _, _), days) in approved.into_iter().zip(counts) {
        match used.iter_mut().find(|(t, _)| *t == leave_type) {
            Some((_, total)) => *total += days,
            None => used.push((leave_type, days)),
        }
    }
    Ok(used)
}

/// Credits for every credited leave type: stored totals where HR set them,
/// the default entitlement otherwise.
fn build_credits(year: i32, stored: &[(String, f64)], used: &[(String, i64)]) -> Vec<LeaveCredit> {
    CREDITED_TYPES
        .iter()
        .map(|leave_type| {
            let name = leave_type.to_string();
            let total = stored
                .iter()
                .find(|(t, _)| *t == name)
                .map(|(_, days)| *days)
                .unwrap_or_else(|| default_entitlement(*leave_type));
            let used = used
                .iter()
                .find(|(t, _)| *t == name)
                .map(|(_, days)| *days as f64)
                .unwrap_or(0.0);
            LeaveCredit::new(name, year, total, used)
        })
        .collect()
}

async fn load_credits(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
) -> AppResult<Vec<LeaveCredit>> {
    let stored = sqlx::query_as::<_, (String, f64)>(
        "SELECT leave_type, total_days FROM leave_credits WHERE employee_id = ? AND year = ?",
    )
    .bind(employee_id)
    .bind(year)
    .fetch_all(&mut *conn)
    .await?;

    let used = used_days(conn, employee_id, year).await?;
    Ok(build_credits(year, &stored, &used))
}

/// Serializes leave bookkeeping of one employee for the rest of `conn`'s
/// transaction.
async fn lock_employee(conn: &mut MySqlConnection, employee_id: u64) -> AppResult<()> {
    sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;
    Ok(())
}

/// Fails when a paid leave of `days` would exceed what is left for the year.
fn ensure_credit(credits: &[LeaveCredit], leave_type: LeaveType, days: i64) -> AppResult<()> {
    if !leave_type.is_paid() {
        return Ok(());
    }
    let name = leave_type.to_string();
    let remaining = credits
        .iter()
        .find(|c| c.leave_type == name)
        .map(|c| c.remaining_days)
        .unwrap_or(0.0);
    if days as f64 > remaining {
        return Err(AppError::validation(format!(
            "Insufficient {name} leave credits: {remaining} day(s) left, {days} requested"
        )));
    }
    Ok(())
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 31,
            "status": "pending"
         })
        ),
        (status = 400, description = "Invalid dates or insufficient credits"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Overlaps another leave request")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    // 1️⃣ validate dates
    if payload.start_date > payload.end_date {
        return Err(AppError::validation("start_date cannot be after end_date").into());
    }
    if inclusive_days(payload.start_date, payload.end_date) > MAX_LEAVE_DAYS {
        return Err(AppError::validation(format!(
            "A leave request cannot exceed {MAX_LEAVE_DAYS} days"
        ))
        .into());
    }

    let mut tx = pool.begin().await.map_err(AppError::Db)?;
    lock_employee(&mut tx, employee_id).await?;

    // 2️⃣ no overlap with pending or approved leave
    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leave_requests
        WHERE employee_id = ? AND status IN ('pending', 'approved')
        AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Db)?;
    if overlapping > 0 {
        return Err(AppError::conflict("Overlaps another leave request").into());
    }

    // 3️⃣ enough credits left for the working days it covers
    let days = count_chargeable(&mut tx, employee_id, &[(payload.start_date, payload.end_date)])
        .await?
        .first()
        .copied()
        .unwrap_or(0);
    if days == 0 {
        return Err(AppError::validation("Leave covers no working days").into());
    }
    let credits = load_credits(&mut tx, employee_id, payload.start_date.year()).await?;
    ensure_credit(&credits, payload.leave_type, days)?;

    // 4️⃣ insert request
    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, start_date, end_date, leave_type, reason)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.leave_type.to_string())
    .bind(&payload.reason)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create leave request");
        AppError::Db(e)
    })?;

    tx.commit().await.map_err(AppError::Db)?;
    info!(employee_id, leave_id = result.last_insert_id(), days, "Leave request submitted");

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave request submitted",
        "id": result.last_insert_id(),
        "status": "pending"
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Insufficient credits"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let leave_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    let owner = sqlx::query_scalar::<_, u64>("SELECT employee_id FROM leave_requests WHERE id = ?")
        .bind(leave_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Db)?
        .ok_or(AppError::NotFound("Leave request"))?;

    // employee first, then the leave row: same order as create_leave
    lock_employee(&mut tx, owner).await?;

    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
    let leave = sqlx::query_as::<_, LeaveResponse>(&sql)
        .bind(leave_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Db)?
        .ok_or(AppError::NotFound("Leave request"))?;

    if leave.status != "pending" {
        return Err(AppError::conflict(format!("Leave request already {}", leave.status)).into());
    }

    if let Ok(leave_type) = leave.leave_type.parse::<LeaveType>() {
        let days = count_chargeable(&mut tx, leave.employee_id, &[(leave.start_date, leave.end_date)])
            .await?
            .first()
            .copied()
            .unwrap_or(0);
        let credits = load_credits(&mut tx, leave.employee_id, leave.start_date.year()).await?;
        ensure_credit(&credits, leave_type, days)?;
    }

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'approved', decided_by = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(auth.principal.id)
    .bind(leave_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Approve leave failed");
        AppError::Db(e)
    })?;

    tx.commit().await.map_err(AppError::Db)?;
    info!(leave_id, employee_id = leave.employee_id, approved_by = auth.principal.id, "Leave approved");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave approved"
    })))
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Leave request not found or already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'rejected', decided_by = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(auth.principal.id)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Reject leave failed");
        AppError::Db(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict("Leave request not found or already processed").into());
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave rejected"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    let leave = sqlx::query_as::<_, LeaveResponse>(&sql)
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to fetch leave request");
            AppError::Db(e)
        })?
        .ok_or(AppError::NotFound("Leave request"))?;

    auth.require_self_or_hr(leave.employee_id)?;
    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = match auth.employee_id() {
        Some(own) => Some(own),
        None => {
            auth.require_hr_or_admin()?;
            query.employee_id
        }
    };

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(SqlValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let total = bind_count_filters(sqlx::query_scalar::<_, i64>(&count_sql), &args)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count leave requests");
            AppError::Db(e)
        })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_sql
    );

    let leaves = bind_filters(sqlx::query_as::<_, LeaveResponse>(&data_sql), &args)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            AppError::Db(e)
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}

/// Remaining leave credits of an employee
#[utoipa::path(
    get,
    path = "/api/leave/credits/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID"), CreditQuery),
    responses(
        (status = 200, description = "Credits per leave type", body = [LeaveCredit]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_employee_leave_credits(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<CreditQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let year = query.year.unwrap_or_else(|| current_year(&config));
    let mut conn = pool.acquire().await.map_err(AppError::Db)?;
    let credits = load_credits(&mut conn, employee_id, year).await?;

    Ok(HttpResponse::Ok().json(credits))
}

/// Write the year's entitlement rows and recount used days (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/leave/credits/refresh",
    request_body = RefreshCredits,
    responses(
        (status = 200, description = "Balances refreshed", body = Object, example = json!({
            "message": "Leave balances refreshed",
            "year": 2026,
            "rows": 120
        })),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn refresh_employee_leave_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: Option<web::Json<RefreshCredits>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    let year = payload.year.unwrap_or_else(|| current_year(&config));

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    let employees = match payload.employee_id {
        Some(employee_id) => vec![employee_id],
        None => sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE is_active = TRUE")
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::Db)?,
    };

    let mut rows = 0u64;
    for employee_id in employees {
        lock_employee(&mut tx, employee_id).await?;
        let used = used_days(&mut tx, employee_id, year).await?;

        for leave_type in CREDITED_TYPES {
            let name = leave_type.to_string();
            let used_for_type = used
                .iter()
                .find(|(t, _)| *t == name)
                .map(|(_, days)| *days)
                .unwrap_or(0);
            let result = sqlx::query(
                r#"
                INSERT INTO leave_credits (employee_id, leave_type, year, total_days, used_days)
                VALUES (?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE used_days = VALUES(used_days)
                "#,
            )
            .bind(employee_id)
            .bind(&name)
            .bind(year)
            .bind(default_entitlement(leave_type))
            .bind(used_for_type)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, employee_id, year, leave_type = %name, "Failed to refresh leave credits");
                AppError::Db(e)
            })?;
            rows += result.rows_affected();
        }
    }

    tx.commit().await.map_err(AppError::Db)?;
    info!(year, rows, employee_id = ?payload.employee_id, "Leave balances refreshed");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave balances refreshed",
        "year": year,
        "rows": rows
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::holiday::HolidayKind;
    use crate::timesheet::classifier::{CalendarHoliday, RestDaySchedule};

    #[test]
    fn credits_fall_back_to_default_entitlement() {
        let stored = vec![("annual".to_string(), 10.0)];
        let used = vec![("annual".to_string(), 4), ("sick".to_string(), 6)];
        let credits = build_credits(2026, &stored, &used);

        let annual = credits.iter().find(|c| c.leave_type == "annual").unwrap();
        assert_eq!((annual.total_days, annual.remaining_days), (10.0, 6.0));

        // default 5 sick days, 6 used
        let sick = credits.iter().find(|c| c.leave_type == "sick").unwrap();
        assert_eq!(sick.remaining_days, 0.0);

        let emergency = credits.iter().find(|c| c.leave_type == "emergency").unwrap();
        assert_eq!(emergency.total_days, 3.0);
    }

    #[test]
    fn week_of_leave_is_charged_only_for_working_days() {
        // Mon June 1 to Sun June 7 2026
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 6, 7).unwrap();
        let rest = RestDaySchedule::sundays();
        let classifier = DayClassifier::new(&[], &rest);

        assert_eq!(inclusive_days(start, end), 7);
        assert_eq!(chargeable_days(&classifier, start, end), 6);
    }

    #[test]
    fn holidays_and_scheduled_rest_days_cost_no_credit() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 6, day).unwrap();
        let holidays = [CalendarHoliday {
            date: d(12),
            name: "Independence Day".to_string(),
            kind: HolidayKind::Regular,
        }];
        // this cutoff rests on Saturdays instead of Sundays
        let rest = RestDaySchedule::explicit([d(6), d(13)]);
        let classifier = DayClassifier::new(&holidays, &rest);

        // June 8-14: Fri 12th is a holiday, Sat 13th a rest day, Sun 14th a working day
        assert_eq!(chargeable_days(&classifier, d(8), d(14)), 5);
        assert_eq!(chargeable_days(&classifier, d(13), d(13)), 0);
    }

    #[test]
    fn unpaid_leave_needs_no_credits() {
        let credits = build_credits(2026, &[], &[]);
        assert!(ensure_credit(&credits, LeaveType::Unpaid, 30).is_ok());
        assert!(ensure_credit(&credits, LeaveType::Annual, 5).is_ok());
        assert!(ensure_credit(&credits, LeaveType::Annual, 6).is_err());
    }
}
