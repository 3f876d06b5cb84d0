use crate::{
    auth::{
        auth::AuthUser,
        handlers::{change_employee_password, revoke_principal_tokens},
        password::{hash_password, validate_password_policy},
        role_cache::{Principal, RoleCache},
    },
    error::AppError,
    model::employee::{EMPLOYEE_COLUMNS, Employee, EmployeeResponse, EmployeeType},
    models::ChangePasswordReq,
    timesheet::source::load_employee,
    utils::db_utils::{SqlValue, bind_count_filters, bind_filters, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns HR may change through `PUT /employee/{id}`.
const EDITABLE_COLUMNS: &[&str] = &[
    "first_name",
    "middle_name",
    "last_name",
    "email",
    "employee_type",
    "job_level",
    "overtime_group_id",
    "eligible_for_ot",
    "eligible_for_nd",
    "hire_date",
    "is_active",
    "daily_rate",
    "monthly_rate",
];

const SALARY_COLUMNS: &[&str] = &["daily_rate", "monthly_rate"];

fn default_true() -> bool {
    true
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    /// Initial password; the employee is expected to change it after the first login.
    #[schema(example = "Welcome2026")]
    pub password: String,
    #[schema(example = "Juan")]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[schema(example = "Dela Cruz")]
    pub last_name: String,
    #[schema(example = "juan@company.ph")]
    pub email: Option<String>,
    pub employee_type: EmployeeType,
    #[schema(example = "rank-and-file")]
    pub job_level: Option<String>,
    #[schema(example = 750.0)]
    pub daily_rate: Option<f64>,
    pub monthly_rate: Option<f64>,
    pub overtime_group_id: Option<u64>,
    #[serde(default = "default_true")]
    pub eligible_for_ot: bool,
    #[serde(default = "default_true")]
    pub eligible_for_nd: bool,
    #[schema(example = "2026-01-01", value_type = String)]
    pub hire_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `office-based` or `client-based`
    pub employee_type: Option<String>,
    pub overtime_group_id: Option<u64>,
    pub is_active: Option<bool>,
    /// Search by code, name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<EmployeeResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created",
            "id": 12
        })),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "HR/Admin only, or rates without salary access"),
        (status = 409, description = "Employee code already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let code = payload.employee_code.trim();
    if code.is_empty() || payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty()
    {
        return Err(AppError::validation("Employee code, first name and last name are required").into());
    }
    if (payload.daily_rate.is_some() || payload.monthly_rate.is_some()) && !auth.has_salary_access() {
        return Err(AppError::forbidden("Salary access required to set rates").into());
    }
    if payload.daily_rate.is_some_and(|r| r < 0.0) || payload.monthly_rate.is_some_and(|r| r < 0.0) {
        return Err(AppError::validation("Rates cannot be negative").into());
    }
    validate_password_policy(&payload.password)?;

    let hashed = hash_password(&payload.password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, password, first_name, middle_name, last_name, email, employee_type,
         job_level, daily_rate, monthly_rate, overtime_group_id, eligible_for_ot, eligible_for_nd,
         hire_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(code)
    .bind(hashed)
    .bind(payload.first_name.trim())
    .bind(&payload.middle_name)
    .bind(payload.last_name.trim())
    .bind(&payload.email)
    .bind(payload.employee_type.to_string())
    .bind(&payload.job_level)
    .bind(payload.daily_rate.unwrap_or(0.0))
    .bind(payload.monthly_rate)
    .bind(payload.overtime_group_id)
    .bind(payload.eligible_for_ot)
    .bind(payload.eligible_for_nd)
    .bind(payload.hire_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            info!(employee_id = done.last_insert_id(), code, "Employee created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Employee created",
                "id": done.last_insert_id()
            })))
        }
        Err(e) if AppError::is_duplicate_key(&e) => {
            Err(AppError::conflict("Employee code already exists").into())
        }
        Err(e) => {
            error!(error = %e, "Failed to create employee");
            Err(AppError::Db(e).into())
        }
    }
}

// -------------------- Handler --------------------

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Staff only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<SqlValue> = Vec::new();

    if let Some(employee_type) = &query.employee_type {
        conditions.push("employee_type = ?");
        bindings.push(SqlValue::String(employee_type.clone()));
    }

    if let Some(group_id) = query.overtime_group_id {
        conditions.push("overtime_group_id = ?");
        bindings.push(SqlValue::U64(group_id));
    }

    if let Some(active) = query.is_active {
        conditions.push("is_active = ?");
        bindings.push(SqlValue::Bool(active));
    }

    if let Some(search) = &query.search {
        conditions.push("(employee_code LIKE ? OR first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        for _ in 0..4 {
            bindings.push(SqlValue::String(like.clone()));
        }
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let total = bind_count_filters(sqlx::query_scalar::<_, i64>(&count_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %count_sql, "Failed to count employees");
            AppError::Db(e)
        })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {} ORDER BY last_name, first_name LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let employees = bind_filters(sqlx::query_as::<_, Employee>(&data_sql), &bindings)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %data_sql, "Failed to fetch employees");
            AppError::Db(e)
        })?;

    let with_salary = auth.has_salary_access();
    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees
            .into_iter()
            .map(|e| e.into_response(with_salary))
            .collect(),
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated"
        })),
        (status = 400, description = "Field cannot be updated or has an invalid value"),
        (status = 403, description = "HR/Admin only, or rates without salary access"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    role_cache: web::Data<RoleCache>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    if let Some(obj) = body.as_object() {
        if SALARY_COLUMNS.iter().any(|c| obj.contains_key(*c)) && !auth.has_salary_access() {
            return Err(AppError::forbidden("Salary access required to change rates").into());
        }
        if let Some(kind) = obj.get("employee_type") {
            let valid = kind.as_str().is_some_and(|k| k.parse::<EmployeeType>().is_ok());
            if !valid {
                return Err(AppError::validation("employee_type must be office-based or client-based").into());
            }
        }
    }

    let update = build_update_sql("employees", &body, EDITABLE_COLUMNS, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, employee_id, "Failed to update employee");
        AppError::Db(e)
    })?;

    if affected == 0 && load_employee(pool.get_ref(), employee_id).await.is_err() {
        return Err(AppError::NotFound("Employee").into());
    }

    if let Some(active) = body.get("is_active").and_then(Value::as_bool) {
        let principal = Principal::employee(employee_id);
        role_cache.invalidate(principal).await;
        if !active {
            revoke_principal_tokens(pool.get_ref(), principal)
                .await
                .map_err(AppError::Db)?;
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated" })))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    role_cache: web::Data<RoleCache>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to delete employee");
            AppError::Db(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Employee").into());
    }

    role_cache.invalidate(Principal::employee(employee_id)).await;
    info!(employee_id, deleted_by = auth.principal.id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = EmployeeResponse),
        (status = 403, description = "Not allowed to view this employee"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = path.into_inner();
    if auth.is_employee() {
        auth.require_self_or_hr(employee_id)?;
    }

    let employee = load_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee.into_response(auth.has_salary_access())))
}

/// Profile of the logged-in employee
#[utoipa::path(
    get,
    path = "/api/employee/me",
    responses(
        (status = 200, description = "Own profile", body = EmployeeResponse),
        (status = 403, description = "Employee login required")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn my_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let employee = load_employee(pool.get_ref(), employee_id).await?;
    // employees see their own rates
    Ok(HttpResponse::Ok().json(employee.into_response(true)))
}

/// Change the logged-in employee's password
#[utoipa::path(
    post,
    path = "/api/employee/change-password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "message": "Password changed"
        })),
        (status = 400, description = "New password violates the policy"),
        (status = 401, description = "Current password is incorrect"),
        (status = 403, description = "Employee login required")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ChangePasswordReq>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    change_employee_password(
        pool.get_ref(),
        employee_id,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed" })))
}
