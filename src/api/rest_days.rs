//! Per-employee rest-day schedules. Employees without rows for a range rest
//! on Sundays.

use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    timesheet::{RestDaySchedule, source::load_employee},
};

/// Longest range a single schedule call may cover.
const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRestDays {
    #[schema(example = "2026-06-01", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-06-30", value_type = String)]
    pub to: NaiveDate,
    /// Rest days inside `from..=to`; existing rows in the range are replaced.
    #[schema(example = json!(["2026-06-06", "2026-06-13"]), value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeQuery {
    #[param(value_type = String, example = "2026-06-01")]
    pub from: NaiveDate,
    #[param(value_type = String, example = "2026-06-30")]
    pub to: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestDayList {
    pub employee_id: u64,
    /// False when the range has no rows and Sundays apply throughout.
    pub explicit: bool,
    #[schema(value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), AppError> {
    if from > to {
        return Err(AppError::validation("from cannot be after to"));
    }
    if (to - from).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::validation(format!(
            "Range cannot exceed {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Rest days in `from..=to` as the timesheet sees them. Cutoffs without
/// rows fall back to Sundays.
fn effective_rest_days(rows: Vec<NaiveDate>, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let schedule = RestDaySchedule::explicit(rows);
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| schedule.is_rest_day(*d))
        .collect()
}

/// Replace an employee's rest days in a range (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/rest-days/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = SetRestDays,
    responses(
        (status = 200, description = "Schedule saved", body = Object, example = json!({
            "message": "Rest days saved",
            "count": 8
        })),
        (status = 400, description = "Invalid range or date outside the range"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn set_rest_days(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SetRestDays>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();
    validate_range(payload.from, payload.to)?;

    if let Some(outside) = payload
        .dates
        .iter()
        .find(|d| **d < payload.from || **d > payload.to)
    {
        return Err(AppError::validation(format!("{outside} is outside the given range")).into());
    }

    load_employee(pool.get_ref(), employee_id).await?;

    let mut dates = payload.dates.clone();
    dates.sort();
    dates.dedup();

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    sqlx::query("DELETE FROM rest_days WHERE employee_id = ? AND rest_date BETWEEN ? AND ?")
        .bind(employee_id)
        .bind(payload.from)
        .bind(payload.to)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Db)?;

    for date in &dates {
        sqlx::query("INSERT INTO rest_days (employee_id, rest_date) VALUES (?, ?)")
            .bind(employee_id)
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, employee_id, %date, "Failed to insert rest day");
                AppError::Db(e)
            })?;
    }

    tx.commit().await.map_err(AppError::Db)?;

    info!(employee_id, from = %payload.from, to = %payload.to, count = dates.len(), "Rest days saved");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Rest days saved",
        "count": dates.len()
    })))
}

/// Rest days of an employee in a range
#[utoipa::path(
    get,
    path = "/api/rest-days/{employee_id}",
    params(("employee_id", Path, description = "Employee ID"), RangeQuery),
    responses(
        (status = 200, description = "Rest days", body = RestDayList),
        (status = 403, description = "Not allowed to view this employee")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
pub async fn list_rest_days(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;
    validate_range(query.from, query.to)?;

    let dates = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT rest_date FROM rest_days \
         WHERE employee_id = ? AND rest_date BETWEEN ? AND ? ORDER BY rest_date",
    )
    .bind(employee_id)
    .bind(query.from)
    .bind(query.to)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch rest days");
        AppError::Db(e)
    })?;

    let list = RestDayList {
        employee_id,
        explicit: !dates.is_empty(),
        dates: effective_rest_days(dates, query.from, query.to),
    };

    Ok(HttpResponse::Ok().json(list))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    #[test]
    fn default_schedule_is_sundays() {
        assert_eq!(
            effective_rest_days(Vec::new(), d(6, 1), d(6, 14)),
            vec![d(6, 7), d(6, 14)]
        );
    }

    #[test]
    fn rows_only_replace_sundays_in_their_own_cutoff() {
        let rows = vec![d(6, 6), d(6, 13)];
        assert_eq!(
            effective_rest_days(rows, d(6, 1), d(6, 30)),
            vec![d(6, 6), d(6, 13), d(6, 21), d(6, 28)]
        );
    }

    #[test]
    fn range_must_be_ordered_and_bounded() {
        assert!(validate_range(d(6, 1), d(6, 30)).is_ok());
        assert!(validate_range(d(6, 30), d(6, 1)).is_err());
        assert!(validate_range(d(1, 1), NaiveDate::from_ymd_opt(2027, 1, 2).unwrap()).is_err());
    }
}
