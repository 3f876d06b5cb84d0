use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::approvals::{DecisionReq, decide},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        approval::{ApprovalAction, RequestKind},
        overtime::{OvertimeRequest, requested_hours},
        role::Role,
    },
    utils::db_utils::{SqlValue, bind_count_filters, bind_filters},
};

const OVERTIME_COLUMNS: &str = "r.id, r.employee_id, r.ot_date, r.start_time, r.end_time, r.hours, \
     r.reason, r.status, r.stage1_by, r.stage2_by, r.final_by, r.rejected_by, r.rejection_reason, \
     r.created_at";

const OVERTIME_FROM: &str = "FROM overtime_requests r \
     JOIN employees e ON e.id = r.employee_id \
     LEFT JOIN overtime_groups g ON g.id = e.overtime_group_id";

/// Longest overtime a single request may cover.
const MAX_REQUEST_HOURS: f64 = 12.0;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOvertime {
    #[schema(example = "2026-06-02", value_type = String)]
    pub ot_date: NaiveDate,
    #[schema(example = "18:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "21:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = "Month-end closing")]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OvertimeFilter {
    /// Staff only
    pub employee_id: Option<u64>,
    /// `pending`, `stage1_approved`, `stage2_approved`, `final` or `rejected`
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct OvertimeListResponse {
    pub data: Vec<OvertimeRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 4)]
    pub total: i64,
}

/// Which overtime requests the caller may see, as a `WHERE` fragment.
fn visibility(auth: &AuthUser) -> AppResult<(&'static str, Option<SqlValue>)> {
    if let Some(employee_id) = auth.employee_id() {
        return Ok(("r.employee_id = ?", Some(SqlValue::U64(employee_id))));
    }
    let user_id = auth.require_staff()?;
    Ok(match auth.role {
        Role::OtApprover => ("g.approver_id = ?", Some(SqlValue::U64(user_id))),
        Role::OtViewer => ("g.viewer_id = ?", Some(SqlValue::U64(user_id))),
        Role::Admin | Role::Hr | Role::AccountManager => ("1=1", None),
        Role::Employee => return Err(AppError::forbidden("Staff login required")),
    })
}

/// File an overtime request
#[utoipa::path(
    post,
    path = "/api/overtime",
    request_body = CreateOvertime,
    responses(
        (status = 201, description = "Request filed", body = Object, example = json!({
            "message": "Overtime request submitted",
            "id": 18,
            "hours": 3.0,
            "status": "pending"
        })),
        (status = 400, description = "Invalid times or reason"),
        (status = 403, description = "Employee login required or not eligible"),
        (status = 409, description = "An open request exists for that date")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn create_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOvertime>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("A reason is required").into());
    }
    if payload.start_time == payload.end_time {
        return Err(AppError::validation("start_time and end_time cannot be equal").into());
    }
    let hours = requested_hours(payload.start_time, payload.end_time);
    if hours > MAX_REQUEST_HOURS {
        return Err(AppError::validation(format!(
            "A request cannot exceed {MAX_REQUEST_HOURS} hours"
        ))
        .into());
    }

    let eligible = sqlx::query_scalar::<_, bool>("SELECT eligible_for_ot FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::Db)?
        .ok_or(AppError::NotFound("Employee"))?;
    if !eligible {
        return Err(AppError::forbidden("Not eligible for overtime").into());
    }

    let open = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM overtime_requests \
         WHERE employee_id = ? AND ot_date = ? AND status <> 'rejected'",
    )
    .bind(employee_id)
    .bind(payload.ot_date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(AppError::Db)?;
    if open > 0 {
        return Err(AppError::conflict("An overtime request already exists for that date").into());
    }

    let result = sqlx::query(
        r#"
        INSERT INTO overtime_requests (employee_id, ot_date, start_time, end_time, hours, reason)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.ot_date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(hours)
    .bind(reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create overtime request");
        AppError::Db(e)
    })?;

    info!(employee_id, request_id = result.last_insert_id(), hours, "Overtime request filed");

    Ok(HttpResponse::Created().json(json!({
        "message": "Overtime request submitted",
        "id": result.last_insert_id(),
        "hours": hours,
        "status": "pending"
    })))
}

/// List overtime requests visible to the caller
#[utoipa::path(
    get,
    path = "/api/overtime",
    params(OvertimeFilter),
    responses(
        (status = 200, description = "Paginated overtime requests", body = OvertimeListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn list_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<OvertimeFilter>,
) -> actix_web::Result<impl Responder> {
    let (scope, scope_arg) = visibility(&auth)?;

    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = format!(" WHERE {scope}");
    let mut args: Vec<SqlValue> = scope_arg.into_iter().collect();

    if let (Some(employee_id), false) = (query.employee_id, auth.is_employee()) {
        where_sql.push_str(" AND r.employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND r.status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    let count_sql = format!("SELECT COUNT(*) {OVERTIME_FROM}{where_sql}");
    let total = bind_count_filters(sqlx::query_scalar::<_, i64>(&count_sql), &args)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count overtime requests");
            AppError::Db(e)
        })?;

    let data_sql = format!(
        "SELECT {OVERTIME_COLUMNS} {OVERTIME_FROM}{where_sql} ORDER BY r.ot_date DESC, r.id DESC LIMIT ? OFFSET ?"
    );
    let requests = bind_filters(sqlx::query_as::<_, OvertimeRequest>(&data_sql), &args)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch overtime requests");
            AppError::Db(e)
        })?;

    Ok(HttpResponse::Ok().json(OvertimeListResponse {
        data: requests,
        page,
        per_page,
        total,
    }))
}

/// Overtime request details
#[utoipa::path(
    get,
    path = "/api/overtime/{request_id}",
    params(("request_id", Path, description = "Overtime request ID")),
    responses(
        (status = 200, description = "Overtime request", body = OvertimeRequest),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn get_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let (scope, scope_arg) = visibility(&auth)?;
    let request_id = path.into_inner();

    let mut args: Vec<SqlValue> = scope_arg.into_iter().collect();
    args.push(SqlValue::U64(request_id));

    let sql = format!("SELECT {OVERTIME_COLUMNS} {OVERTIME_FROM} WHERE {scope} AND r.id = ?");
    let request = bind_filters(sqlx::query_as::<_, OvertimeRequest>(&sql), &args)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, request_id, "Failed to fetch overtime request");
            AppError::Db(e)
        })?
        .ok_or(AppError::NotFound("Overtime request"))?;

    Ok(HttpResponse::Ok().json(request))
}

/// Approve the current stage of an overtime request
#[utoipa::path(
    put,
    path = "/api/overtime/{request_id}/approve",
    params(("request_id", Path, description = "Overtime request ID")),
    responses(
        (status = 200, description = "Stage approved", body = Object, example = json!({
            "message": "Overtime request approved",
            "status": "stage1_approved"
        })),
        (status = 403, description = "Caller cannot act on this stage"),
        (status = 404, description = "Overtime request not found"),
        (status = 409, description = "Already processed")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn approve_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let status = decide(
        pool.get_ref(),
        &auth,
        RequestKind::Overtime,
        path.into_inner(),
        ApprovalAction::Approve,
        None,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Overtime request approved",
        "status": status
    })))
}

/// Reject an overtime request
#[utoipa::path(
    put,
    path = "/api/overtime/{request_id}/reject",
    params(("request_id", Path, description = "Overtime request ID")),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Request rejected", body = Object, example = json!({
            "message": "Overtime request rejected",
            "status": "rejected"
        })),
        (status = 403, description = "Caller cannot act on this stage"),
        (status = 404, description = "Overtime request not found"),
        (status = 409, description = "Already processed")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn reject_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionReq>>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    let status = decide(
        pool.get_ref(),
        &auth,
        RequestKind::Overtime,
        path.into_inner(),
        ApprovalAction::Reject,
        payload.reason.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Overtime request rejected",
        "status": status
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role_cache::Principal;

    fn caller(principal: Principal, role: Role) -> AuthUser {
        AuthUser {
            principal,
            subject: "test".to_string(),
            role,
            can_access_salary: false,
        }
    }

    #[test]
    fn employees_only_see_their_own_requests() {
        let (clause, arg) = visibility(&caller(Principal::employee(12), Role::Employee)).unwrap();
        assert_eq!(clause, "r.employee_id = ?");
        assert_eq!(arg, Some(SqlValue::U64(12)));
    }

    #[test]
    fn group_roles_are_scoped_to_their_groups() {
        let (clause, arg) = visibility(&caller(Principal::user(4), Role::OtApprover)).unwrap();
        assert_eq!((clause, arg), ("g.approver_id = ?", Some(SqlValue::U64(4))));

        let (clause, _) = visibility(&caller(Principal::user(5), Role::OtViewer)).unwrap();
        assert_eq!(clause, "g.viewer_id = ?");

        let (clause, arg) = visibility(&caller(Principal::user(1), Role::Hr)).unwrap();
        assert_eq!((clause, arg), ("1=1", None));
    }
}
