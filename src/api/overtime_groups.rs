use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{overtime::OvertimeGroup, role::Role},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOvertimeGroup {
    #[schema(example = "Operations")]
    pub name: String,
    /// Staff user with the `ot_approver` role
    #[schema(example = 4)]
    pub approver_id: Option<u64>,
    /// Staff user with the `ot_viewer` role
    #[schema(example = 5)]
    pub viewer_id: Option<u64>,
}

/// Fails unless `user_id` is an active staff user with `role`.
async fn ensure_role(pool: &MySqlPool, user_id: u64, role: Role, field: &str) -> AppResult<()> {
    let found = sqlx::query_scalar::<_, String>(
        "SELECT role FROM users WHERE id = ? AND is_active = TRUE",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match found.as_deref().and_then(Role::assignable) {
        Some(r) if r == role => Ok(()),
        _ => Err(AppError::validation(format!(
            "{field} must be an active {role} user"
        ))),
    }
}

/// List overtime groups
#[utoipa::path(
    get,
    path = "/api/overtime-groups",
    responses(
        (status = 200, description = "Overtime groups", body = [OvertimeGroup]),
        (status = 403, description = "Staff only")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn list_overtime_groups(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let groups = sqlx::query_as::<_, OvertimeGroup>(
        "SELECT id, name, approver_id, viewer_id FROM overtime_groups ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch overtime groups");
        AppError::Db(e)
    })?;

    Ok(HttpResponse::Ok().json(groups))
}

/// Create an overtime group (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/overtime-groups",
    request_body = CreateOvertimeGroup,
    responses(
        (status = 201, description = "Group created", body = Object, example = json!({
            "message": "Overtime group created",
            "id": 3
        })),
        (status = 400, description = "Approver or viewer has the wrong role"),
        (status = 409, description = "Group name already exists")
    ),
    tag = "Overtime",
    security(("bearer_auth" = []))
)]
pub async fn create_overtime_group(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOvertimeGroup>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Group name is required").into());
    }
    if let Some(approver_id) = payload.approver_id {
        ensure_role(pool.get_ref(), approver_id, Role::OtApprover, "approver_id").await?;
    }
    if let Some(viewer_id) = payload.viewer_id {
        ensure_role(pool.get_ref(), viewer_id, Role::OtViewer, "viewer_id").await?;
    }

    let result = sqlx::query(
        "INSERT INTO overtime_groups (name, approver_id, viewer_id) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(payload.approver_id)
    .bind(payload.viewer_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            info!(group_id = done.last_insert_id(), name, "Overtime group created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Overtime group created",
                "id": done.last_insert_id()
            })))
        }
        Err(e) if AppError::is_duplicate_key(&e) => {
            Err(AppError::conflict("Group name already exists").into())
        }
        Err(e) => {
            error!(error = %e, "Failed to create overtime group");
            Err(AppError::Db(e).into())
        }
    }
}
