use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlPool, types::Json};
use tracing::{error, info, warn};
use utoipa::IntoParams;

use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::weekly_attendance::WeeklyAttendance,
    timesheet::{BiMonthlyPeriod, reconcile::diff_days, source::load_sources},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct PeriodQuery {
    /// Any date inside the wanted period; defaults to today (local time)
    #[param(value_type = Option<String>, example = "2026-06-10")]
    pub date: Option<NaiveDate>,
}

/// The period containing `date`, or the current one.
pub fn period_for(date: Option<NaiveDate>, config: &Config) -> BiMonthlyPeriod {
    let date = date.unwrap_or_else(|| Utc::now().with_timezone(&config.local_offset()).date_naive());
    BiMonthlyPeriod::containing(date)
}

/// Timesheet recomputed from clock entries
#[utoipa::path(
    get,
    path = "/api/timesheets/{employee_id}",
    params(("employee_id", Path, description = "Employee ID"), PeriodQuery),
    responses(
        (status = 200, description = "Timesheet for the period", body = Object, example = json!({
            "employee_id": 12,
            "period": { "start": "2026-06-01", "end": "2026-06-15" },
            "days": [{
                "date": "2026-06-01",
                "day_name": "Mon",
                "day_type": "regular_day",
                "status": "present",
                "regular_hours": 8.0,
                "overtime_hours": 0.0
            }],
            "totals": { "days_present": 10, "regular_hours": 80.0 }
        })),
        (status = 403, description = "Not allowed to view this employee"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn get_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let period = period_for(query.date, &config);
    let sources = load_sources(pool.get_ref(), employee_id, period).await?;

    Ok(HttpResponse::Ok().json(sources.generate(&config.shift_rules())))
}

/// Generate and store the attendance snapshot (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/timesheets/{employee_id}/generate",
    params(("employee_id", Path, description = "Employee ID"), PeriodQuery),
    responses(
        (status = 200, description = "Snapshot stored", body = Object, example = json!({
            "message": "Timesheet generated",
            "period_start": "2026-06-01",
            "period_end": "2026-06-15",
            "total_regular_hours": 80.0,
            "total_overtime_hours": 4.0,
            "total_night_diff_hours": 0.0
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn generate_timesheet(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let period = period_for(query.date, &config);
    let sources = load_sources(pool.get_ref(), employee_id, period).await?;
    let timesheet = sources.generate(&config.shift_rules());
    let totals = &timesheet.totals;
    let night_diff = totals.night_diff_hours + totals.night_diff_ot_hours;

    sqlx::query(
        r#"
        INSERT INTO weekly_attendance
        (employee_id, period_start, period_end, attendance_data, total_regular_hours,
         total_overtime_hours, total_night_diff_hours, generated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, UTC_TIMESTAMP())
        ON DUPLICATE KEY UPDATE
            period_end = VALUES(period_end),
            attendance_data = VALUES(attendance_data),
            total_regular_hours = VALUES(total_regular_hours),
            total_overtime_hours = VALUES(total_overtime_hours),
            total_night_diff_hours = VALUES(total_night_diff_hours),
            generated_at = VALUES(generated_at)
        "#,
    )
    .bind(employee_id)
    .bind(period.start)
    .bind(period.end)
    .bind(Json(&timesheet.days))
    .bind(totals.regular_hours)
    .bind(totals.overtime_hours)
    .bind(night_diff)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, %period, "Failed to store attendance snapshot");
        AppError::Db(e)
    })?;

    info!(employee_id, %period, generated_by = auth.principal.id, "Timesheet generated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Timesheet generated",
        "period_start": period.start,
        "period_end": period.end,
        "total_regular_hours": totals.regular_hours,
        "total_overtime_hours": totals.overtime_hours,
        "total_night_diff_hours": night_diff
    })))
}

/// Compare the stored snapshot with a fresh computation (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/timesheets/{employee_id}/drift",
    params(("employee_id", Path, description = "Employee ID"), PeriodQuery),
    responses(
        (status = 200, description = "Differences between snapshot and sources", body = Object, example = json!({
            "employee_id": 12,
            "period_start": "2026-06-01",
            "generated_at": "2026-06-16T01:00:00",
            "in_sync": false,
            "drift": [{
                "date": "2026-06-03",
                "field": "overtime_hours",
                "stored": "0",
                "recomputed": "2"
            }]
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "No snapshot for the period")
    ),
    tag = "Timesheet",
    security(("bearer_auth" = []))
)]
pub async fn timesheet_drift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();
    let period = period_for(query.date, &config);

    let stored = sqlx::query_as::<_, WeeklyAttendance>(
        r#"
        SELECT id, employee_id, period_start, period_end, attendance_data, total_regular_hours,
               total_overtime_hours, total_night_diff_hours, generated_at
        FROM weekly_attendance
        WHERE employee_id = ? AND period_start = ?
        "#,
    )
    .bind(employee_id)
    .bind(period.start)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, %period, "Failed to load attendance snapshot");
        AppError::Db(e)
    })?
    .ok_or(AppError::NotFound("Attendance snapshot"))?;

    let sources = load_sources(pool.get_ref(), employee_id, period).await?;
    let fresh = sources.generate(&config.shift_rules());
    let drift = diff_days(&stored.attendance_data.0, &fresh.days);

    if !drift.is_empty() {
        warn!(employee_id, %period, differences = drift.len(), "Attendance snapshot drifted");
    }

    Ok(HttpResponse::Ok().json(json!({
        "employee_id": employee_id,
        "period_start": stored.period_start,
        "generated_at": stored.generated_at,
        "in_sync": drift.is_empty(),
        "drift": drift
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_date_picks_its_half_month() {
        let config = Config::for_tests("secret");
        let date = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let period = period_for(Some(date), &config);
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2026, 2, 16).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }
}
