use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::holiday::{Holiday, HolidayKind},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "2026-06-12", value_type = String)]
    pub holiday_date: NaiveDate,
    #[schema(example = "Independence Day")]
    pub name: String,
    pub kind: HolidayKind,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Calendar year; defaults to every year
    pub year: Option<i32>,
}

/// List holidays
#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holiday calendar", body = [Holiday])
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let holidays = match query.year {
        Some(year) => {
            let (from, to) = NaiveDate::from_ymd_opt(year, 1, 1)
                .zip(NaiveDate::from_ymd_opt(year, 12, 31))
                .ok_or_else(|| AppError::validation("Invalid year"))?;
            sqlx::query_as::<_, Holiday>(
                "SELECT id, holiday_date, name, kind FROM holidays \
                 WHERE holiday_date BETWEEN ? AND ? ORDER BY holiday_date",
            )
            .bind(from)
            .bind(to)
            .fetch_all(pool.get_ref())
            .await
        }
        None => {
            sqlx::query_as::<_, Holiday>(
                "SELECT id, holiday_date, name, kind FROM holidays ORDER BY holiday_date",
            )
            .fetch_all(pool.get_ref())
            .await
        }
    }
    .map_err(|e| {
        error!(error = %e, "Failed to fetch holidays");
        AppError::Db(e)
    })?;

    Ok(HttpResponse::Ok().json(holidays))
}

/// Add a holiday (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday added", body = Object, example = json!({
            "message": "Holiday added",
            "id": 4
        })),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Holiday already exists for that date")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Holiday name is required").into());
    }

    let result = sqlx::query("INSERT INTO holidays (holiday_date, name, kind) VALUES (?, ?, ?)")
        .bind(payload.holiday_date)
        .bind(name)
        .bind(payload.kind.to_string())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(done) => {
            info!(
                date = %payload.holiday_date,
                year = payload.holiday_date.year(),
                kind = %payload.kind,
                "Holiday added"
            );
            Ok(HttpResponse::Created().json(json!({
                "message": "Holiday added",
                "id": done.last_insert_id()
            })))
        }
        Err(e) if AppError::is_duplicate_key(&e) => {
            Err(AppError::conflict("Holiday already exists for that date").into())
        }
        Err(e) => {
            error!(error = %e, "Failed to add holiday");
            Err(AppError::Db(e).into())
        }
    }
}

/// Remove a holiday (HR/Admin)
#[utoipa::path(
    delete,
    path = "/api/holidays/{holiday_id}",
    params(("holiday_id", Path, description = "Holiday ID")),
    responses(
        (status = 200, description = "Holiday removed", body = Object, example = json!({
            "message": "Holiday removed"
        })),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let holiday_id = path.into_inner();

    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, holiday_id, "Failed to remove holiday");
            AppError::Db(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Holiday").into());
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Holiday removed" })))
}
