//! Stage decisions shared by overtime and fund requests.

use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::approval::{ApprovalAction, ApprovalError, ApprovalStatus, Approver, RequestKind},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionReq {
    /// Recorded when rejecting
    #[schema(example = "Not covered by the project budget")]
    pub reason: Option<String>,
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::AlreadyProcessed(_) => AppError::conflict(err.to_string()),
            ApprovalError::NotPermitted { .. } => AppError::forbidden(err.to_string()),
        }
    }
}

/// Moves request `request_id` one step according to `action` and records the
/// acting staff user in the stage's `*_by` column.
pub async fn decide(
    pool: &MySqlPool,
    auth: &AuthUser,
    kind: RequestKind,
    request_id: u64,
    action: ApprovalAction,
    reason: Option<&str>,
) -> AppResult<ApprovalStatus> {
    let user_id = auth.require_staff()?;
    let table = kind.table();

    let mut tx = pool.begin().await?;

    let sql = format!(
        "SELECT r.status, g.approver_id FROM {table} r \
         JOIN employees e ON e.id = r.employee_id \
         LEFT JOIN overtime_groups g ON g.id = e.overtime_group_id \
         WHERE r.id = ? FOR UPDATE"
    );
    let (raw_status, group_approver) = sqlx::query_as::<_, (String, Option<u64>)>(&sql)
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound(kind.label()))?;

    let status: ApprovalStatus = raw_status
        .parse()
        .map_err(|_| AppError::Internal(format!("{table}.{request_id} has status {raw_status:?}")))?;

    let approver = Approver {
        role: auth.role,
        is_group_approver: kind == RequestKind::Overtime && group_approver == Some(user_id),
    };

    let next = kind.transition(status, action, approver).inspect_err(|e| {
        warn!(request_id, table, user_id, error = %e, "Approval refused");
    })?;

    let update = format!(
        "UPDATE {table} SET status = ?, {}_by = ?, rejection_reason = COALESCE(?, rejection_reason) \
         WHERE id = ? AND status = ?",
        next.actor_column()
    );
    let rejection_reason = match action {
        ApprovalAction::Reject => reason.map(str::trim).filter(|r| !r.is_empty()),
        ApprovalAction::Approve => None,
    };

    let result = sqlx::query(&update)
        .bind(next.to_string())
        .bind(user_id)
        .bind(rejection_reason)
        .bind(request_id)
        .bind(status.to_string())
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict("Request was changed by someone else, reload and retry"));
    }

    tx.commit().await?;

    info!(request_id, table, user_id, from = %status, to = %next, "Request decided");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    #[test]
    fn approval_errors_map_to_http_statuses() {
        let processed: AppError = ApprovalError::AlreadyProcessed(ApprovalStatus::Final).into();
        assert_eq!(processed.status_code(), StatusCode::CONFLICT);

        let refused: AppError = ApprovalError::NotPermitted {
            role: Role::OtViewer,
            kind: "overtime",
            status: ApprovalStatus::Pending,
        }
        .into();
        assert_eq!(refused.status_code(), StatusCode::FORBIDDEN);
    }
}
