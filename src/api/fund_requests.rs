use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::approvals::{DecisionReq, decide},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        approval::{ApprovalAction, RequestKind},
        fund_request::FundRequest,
        role::Role,
    },
    utils::db_utils::{SqlValue, bind_count_filters, bind_filters},
};

const FUND_COLUMNS: &str = "id, employee_id, amount, purpose, needed_by, status, stage1_by, \
     stage2_by, final_by, rejected_by, rejection_reason, created_at";

const FUND_VIEWERS: &[Role] = &[Role::Hr, Role::AccountManager];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFundRequest {
    #[schema(example = 2500.0)]
    pub amount: f64,
    #[schema(example = "Client site transportation")]
    pub purpose: String,
    #[schema(example = "2026-06-10", value_type = Option<String>)]
    pub needed_by: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FundFilter {
    /// Staff only
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct FundListResponse {
    pub data: Vec<FundRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 2)]
    pub total: i64,
}

/// File a fund request
#[utoipa::path(
    post,
    path = "/api/fund-requests",
    request_body = CreateFundRequest,
    responses(
        (status = 201, description = "Request filed", body = Object, example = json!({
            "message": "Fund request submitted",
            "id": 7,
            "status": "pending"
        })),
        (status = 400, description = "Invalid amount or purpose"),
        (status = 403, description = "Employee login required")
    ),
    tag = "Fund Requests",
    security(("bearer_auth" = []))
)]
pub async fn create_fund_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFundRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    if !payload.amount.is_finite() || payload.amount <= 0.0 {
        return Err(AppError::validation("amount must be positive").into());
    }
    let purpose = payload.purpose.trim();
    if purpose.is_empty() {
        return Err(AppError::validation("A purpose is required").into());
    }

    let result = sqlx::query(
        "INSERT INTO fund_requests (employee_id, amount, purpose, needed_by) VALUES (?, ?, ?, ?)",
    )
    .bind(employee_id)
    .bind(payload.amount)
    .bind(purpose)
    .bind(payload.needed_by)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create fund request");
        AppError::Db(e)
    })?;

    info!(employee_id, request_id = result.last_insert_id(), amount = payload.amount, "Fund request filed");

    Ok(HttpResponse::Created().json(json!({
        "message": "Fund request submitted",
        "id": result.last_insert_id(),
        "status": "pending"
    })))
}

/// List fund requests
#[utoipa::path(
    get,
    path = "/api/fund-requests",
    params(FundFilter),
    responses(
        (status = 200, description = "Paginated fund requests", body = FundListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Fund Requests",
    security(("bearer_auth" = []))
)]
pub async fn list_fund_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<FundFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<SqlValue> = Vec::new();

    match auth.employee_id() {
        Some(own) => {
            where_sql.push_str(" AND employee_id = ?");
            args.push(SqlValue::U64(own));
        }
        None => {
            auth.require_any(FUND_VIEWERS)?;
            if let Some(employee_id) = query.employee_id {
                where_sql.push_str(" AND employee_id = ?");
                args.push(SqlValue::U64(employee_id));
            }
        }
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    let count_sql = format!("SELECT COUNT(*) FROM fund_requests{where_sql}");
    let total = bind_count_filters(sqlx::query_scalar::<_, i64>(&count_sql), &args)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count fund requests");
            AppError::Db(e)
        })?;

    let data_sql = format!(
        "SELECT {FUND_COLUMNS} FROM fund_requests{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let requests = bind_filters(sqlx::query_as::<_, FundRequest>(&data_sql), &args)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch fund requests");
            AppError::Db(e)
        })?;

    Ok(HttpResponse::Ok().json(FundListResponse {
        data: requests,
        page,
        per_page,
        total,
    }))
}

/// Fund request details
#[utoipa::path(
    get,
    path = "/api/fund-requests/{request_id}",
    params(("request_id", Path, description = "Fund request ID")),
    responses(
        (status = 200, description = "Fund request", body = FundRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Fund request not found")
    ),
    tag = "Fund Requests",
    security(("bearer_auth" = []))
)]
pub async fn get_fund_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();
    if !auth.is_employee() {
        auth.require_any(FUND_VIEWERS)?;
    }

    let sql = format!("SELECT {FUND_COLUMNS} FROM fund_requests WHERE id = ?");
    let request = sqlx::query_as::<_, FundRequest>(&sql)
        .bind(request_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, request_id, "Failed to fetch fund request");
            AppError::Db(e)
        })?
        .filter(|r| auth.employee_id().is_none_or(|own| own == r.employee_id))
        .ok_or(AppError::NotFound("Fund request"))?;

    Ok(HttpResponse::Ok().json(request))
}

/// Approve the current stage of a fund request
#[utoipa::path(
    put,
    path = "/api/fund-requests/{request_id}/approve",
    params(("request_id", Path, description = "Fund request ID")),
    responses(
        (status = 200, description = "Stage approved", body = Object, example = json!({
            "message": "Fund request approved",
            "status": "stage1_approved"
        })),
        (status = 403, description = "Caller cannot act on this stage"),
        (status = 404, description = "Fund request not found"),
        (status = 409, description = "Already processed")
    ),
    tag = "Fund Requests",
    security(("bearer_auth" = []))
)]
pub async fn approve_fund_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let status = decide(
        pool.get_ref(),
        &auth,
        RequestKind::Fund,
        path.into_inner(),
        ApprovalAction::Approve,
        None,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Fund request approved",
        "status": status
    })))
}

/// Reject a fund request
#[utoipa::path(
    put,
    path = "/api/fund-requests/{request_id}/reject",
    params(("request_id", Path, description = "Fund request ID")),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Request rejected", body = Object, example = json!({
            "message": "Fund request rejected",
            "status": "rejected"
        })),
        (status = 403, description = "Caller cannot act on this stage"),
        (status = 404, description = "Fund request not found"),
        (status = 409, description = "Already processed")
    ),
    tag = "Fund Requests",
    security(("bearer_auth" = []))
)]
pub async fn reject_fund_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: Option<web::Json<DecisionReq>>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    let status = decide(
        pool.get_ref(),
        &auth,
        RequestKind::Fund,
        path.into_inner(),
        ApprovalAction::Reject,
        payload.reason.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Fund request rejected",
        "status": status
    })))
}
