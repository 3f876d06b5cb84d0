use crate::{
    auth::{
        auth::AuthUser,
        handlers::revoke_principal_tokens,
        password::{hash_password, validate_password_policy},
        role_cache::{Principal, RoleCache},
    },
    error::AppError,
    model::{role::Role, user::UserResponse},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpResponse, Responder, web};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL_RE should compile"));

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 255 && EMAIL_RE.is_match(email)
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[schema(example = "maria.santos@company.ph")]
    pub email: String,
    #[schema(example = "Welcome2026")]
    pub password: String,
    #[schema(example = "Maria Santos")]
    pub full_name: String,
    #[schema(example = "hr")]
    pub role: String,
    #[serde(default)]
    pub can_access_salary: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteUserReq {
    #[schema(example = 5)]
    pub user_id: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    #[schema(example = 5)]
    pub user_id: u64,
    pub is_active: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserReq {
    pub full_name: Option<String>,
    #[schema(example = "account_manager")]
    pub role: Option<String>,
    pub can_access_salary: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
pub struct UserFilter {
    /// Filter by role
    pub role: Option<String>,
    /// Filter by active flag
    pub is_active: Option<bool>,
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> Result<bool, sqlx::Error> {
    // 1️⃣ Cuckoo filter: a miss means the email was never registered
    if !email_filter::might_exist(email) {
        return Ok(true);
    }

    // 2️⃣ Moka cache: fast positive
    if email_cache::is_taken(email).await {
        return Ok(false);
    }

    // 3️⃣ Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(email_filter::normalize(email))
    .fetch_one(pool)
    .await?;

    if exists {
        email_cache::mark_taken(email).await;
    }
    Ok(!exists)
}

async fn user_exists(pool: &MySqlPool, user_id: u64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Create a staff user (admin only)
#[utoipa::path(
    post,
    path = "/api/users/create",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = Object,
         example = json!({"message": "User created", "id": 5})),
        (status = 400, description = "Invalid email, password, name or role"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUserReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let email = email_filter::normalize(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email address").into());
    }
    validate_password_policy(&payload.password)?;

    let full_name = payload.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::validation("Full name is required").into());
    }

    let role = Role::assignable(&payload.role).ok_or_else(|| {
        AppError::validation(
            "Invalid role. Allowed: admin, hr, account_manager, ot_approver, ot_viewer",
        )
    })?;

    if !is_email_available(&email, pool.get_ref())
        .await
        .map_err(AppError::Db)?
    {
        return Err(AppError::conflict("Email already exists").into());
    }

    let hashed = hash_password(&payload.password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, full_name, role, is_active, can_access_salary)
        VALUES (?, ?, ?, ?, TRUE, ?)
        "#,
    )
    .bind(&email)
    .bind(hashed)
    .bind(full_name)
    .bind(role.to_string())
    .bind(payload.can_access_salary)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;
            info!(user_id = done.last_insert_id(), %role, created_by = auth.principal.id, "User created");

            Ok(HttpResponse::Created().json(json!({
                "message": "User created",
                "id": done.last_insert_id()
            })))
        }
        // lost the race against a concurrent insert
        Err(e) if AppError::is_duplicate_key(&e) => {
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;
            Err(AppError::conflict("Email already exists").into())
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            Err(AppError::Db(e).into())
        }
    }
}

/// Delete a staff user (admin only, never oneself)
#[utoipa::path(
    delete,
    path = "/api/users/delete",
    request_body = DeleteUserReq,
    responses(
        (status = 200, description = "User deleted", body = Object,
         example = json!({"message": "User deleted"})),
        (status = 400, description = "Cannot delete your own account"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    role_cache: web::Data<RoleCache>,
    payload: web::Json<DeleteUserReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if auth.user_id() == Some(payload.user_id) {
        return Err(AppError::validation("Cannot delete your own account").into());
    }

    let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ?")
        .bind(payload.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(AppError::Db)?
        .ok_or(AppError::NotFound("User"))?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(payload.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = payload.user_id, "Failed to delete user");
            AppError::Db(e)
        })?;

    let principal = Principal::user(payload.user_id);
    role_cache.invalidate(principal).await;
    if let Err(e) = revoke_principal_tokens(pool.get_ref(), principal).await {
        error!(error = %e, user_id = payload.user_id, "Failed to revoke tokens of deleted user");
    }
    email_filter::remove(&email);
    email_cache::forget(&email).await;

    info!(user_id = payload.user_id, deleted_by = auth.principal.id, "User deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted" })))
}

/// Activate or deactivate a staff user (admin only, never oneself)
#[utoipa::path(
    patch,
    path = "/api/users/update-status",
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = Object,
         example = json!({"message": "User status updated", "is_active": false})),
        (status = 400, description = "Cannot deactivate your own account"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    role_cache: web::Data<RoleCache>,
    payload: web::Json<UpdateStatusReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if auth.user_id() == Some(payload.user_id) && !payload.is_active {
        return Err(AppError::validation("Cannot deactivate your own account").into());
    }

    if !user_exists(pool.get_ref(), payload.user_id)
        .await
        .map_err(AppError::Db)?
    {
        return Err(AppError::NotFound("User").into());
    }

    sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(payload.is_active)
        .bind(payload.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(AppError::Db)?;

    let principal = Principal::user(payload.user_id);
    role_cache.invalidate(principal).await;
    if !payload.is_active {
        let revoked = revoke_principal_tokens(pool.get_ref(), principal)
            .await
            .map_err(AppError::Db)?;
        info!(user_id = payload.user_id, revoked, "User deactivated");
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "User status updated",
        "is_active": payload.is_active
    })))
}

/// Change a staff user's name, role or salary access (admin only)
#[utoipa::path(
    patch,
    path = "/api/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = UpdateUserReq,
    responses(
        (status = 200, description = "User updated", body = Object,
         example = json!({"message": "User updated"})),
        (status = 400, description = "Invalid role or name"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    role_cache: web::Data<RoleCache>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUserReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    if payload.full_name.is_none() && payload.role.is_none() && payload.can_access_salary.is_none() {
        return Err(AppError::validation("No fields provided for update").into());
    }

    let role = match payload.role.as_deref() {
        Some(r) => Some(
            Role::assignable(r).ok_or_else(|| AppError::validation(format!("Invalid role '{r}'")))?,
        ),
        None => None,
    };
    if auth.user_id() == Some(user_id) && role.is_some_and(|r| r != Role::Admin) {
        return Err(AppError::validation("Cannot remove your own admin role").into());
    }

    let full_name = payload.full_name.as_deref().map(str::trim);
    if full_name.is_some_and(str::is_empty) {
        return Err(AppError::validation("Full name cannot be empty").into());
    }

    if !user_exists(pool.get_ref(), user_id)
        .await
        .map_err(AppError::Db)?
    {
        return Err(AppError::NotFound("User").into());
    }

    sqlx::query(
        r#"
        UPDATE users
        SET full_name = COALESCE(?, full_name),
            role = COALESCE(?, role),
            can_access_salary = COALESCE(?, can_access_salary)
        WHERE id = ?
        "#,
    )
    .bind(full_name)
    .bind(role.map(|r| r.to_string()))
    .bind(payload.can_access_salary)
    .bind(user_id)
    .execute(pool.get_ref())
    .await
    .map_err(AppError::Db)?;

    role_cache.invalidate(Principal::user(user_id)).await;

    Ok(HttpResponse::Ok().json(json!({ "message": "User updated" })))
}

/// List staff users (admin, hr)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Staff users", body = Vec<UserResponse>),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let mut sql = String::from(
        "SELECT id, email, full_name, role, is_active, can_access_salary, last_login_at FROM users WHERE 1=1",
    );
    if query.role.is_some() {
        sql.push_str(" AND role = ?");
    }
    if query.is_active.is_some() {
        sql.push_str(" AND is_active = ?");
    }
    sql.push_str(" ORDER BY full_name");

    let mut q = sqlx::query_as::<_, UserResponse>(&sql);
    if let Some(role) = &query.role {
        q = q.bind(role);
    }
    if let Some(active) = query.is_active {
        q = q.bind(active);
    }

    let users = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to list users");
        AppError::Db(e)
    })?;

    Ok(HttpResponse::Ok().json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_validation() {
        assert!(is_valid_email("hr@company.ph"));
        assert!(!is_valid_email("hr@company"));
        assert!(!is_valid_email("hr company@x.ph"));
        assert!(!is_valid_email(""));
    }
}
