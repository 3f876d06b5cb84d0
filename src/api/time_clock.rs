//! Clock-in / clock-out and time entry maintenance.
//!
//! Clock times are stored as local naive datetimes (see `Config::local_offset`),
//! which is also how the timesheet generator dates them.

use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Executor, MySql, MySqlPool};
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::{AppError, AppResult},
    model::{
        employee::{Employee, EmployeeType},
        office_location::OfficeLocation,
        time_clock::{STATUS_CLOCKED_IN, STATUS_COMPLETED, TimeClockEntry},
    },
    timesheet::{ClockSpan, HourBreakdown, generator::entry_hours, source::load_employee},
    utils::{
        db_utils::{SqlValue, bind_count_filters, bind_filters},
        geo::{self, GeoPoint},
    },
};

const ENTRY_COLUMNS: &str = "id, employee_id, clock_in_time, clock_out_time, regular_hours, \
     overtime_hours, night_diff_hours, status, is_manual_entry, office_location_id, \
     clock_in_latitude, clock_in_longitude, notes";

/// Longest single entry accepted from HR.
const MAX_ENTRY_HOURS: i64 = 24;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClockInReq {
    #[schema(example = 14.5547)]
    pub latitude: Option<f64>,
    #[schema(example = 121.0244)]
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EntryFilter {
    /// Ignored for employees, who always see their own entries
    pub employee_id: Option<u64>,
    /// Inclusive local date (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Inclusive local date (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// `clocked_in` or `completed`
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct EntryListResponse {
    pub data: Vec<TimeClockEntry>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 31)]
    pub total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualEntryReq {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "2026-06-01T09:00:00", value_type = String)]
    pub clock_in_time: NaiveDateTime,
    #[schema(example = "2026-06-01T18:00:00", value_type = String)]
    pub clock_out_time: NaiveDateTime,
    #[schema(example = "Biometric device offline")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CorrectEntryReq {
    #[schema(example = "2026-06-01T09:00:00", value_type = Option<String>)]
    pub clock_in_time: Option<NaiveDateTime>,
    #[schema(example = "2026-06-01T18:00:00", value_type = Option<String>)]
    pub clock_out_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

fn local_now(config: &Config) -> NaiveDateTime {
    Utc::now().with_timezone(&config.local_offset()).naive_local()
}

fn coordinates(req: &ClockInReq) -> AppResult<Option<GeoPoint>> {
    match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => {
            let point = GeoPoint {
                latitude,
                longitude,
            };
            if !point.is_valid() {
                return Err(AppError::validation("Coordinates are out of range"));
            }
            Ok(Some(point))
        }
        (None, None) => Ok(None),
        _ => Err(AppError::validation(
            "latitude and longitude must be sent together",
        )),
    }
}

fn validate_span(clock_in: NaiveDateTime, clock_out: NaiveDateTime) -> AppResult<ClockSpan> {
    if clock_out <= clock_in {
        return Err(AppError::validation("clock_out_time must be after clock_in_time"));
    }
    if clock_out - clock_in > Duration::hours(MAX_ENTRY_HOURS) {
        return Err(AppError::validation(format!(
            "An entry cannot be longer than {MAX_ENTRY_HOURS} hours"
        )));
    }
    Ok(ClockSpan {
        clock_in,
        clock_out,
    })
}

async fn active_offices(pool: &MySqlPool) -> Result<Vec<OfficeLocation>, sqlx::Error> {
    sqlx::query_as::<_, OfficeLocation>(
        "SELECT id, name, latitude, longitude, radius_meters, is_active \
         FROM office_locations WHERE is_active = TRUE",
    )
    .fetch_all(pool)
    .await
}

/// Final-approved overtime for one employee and local date, in minutes.
async fn approved_ot_minutes<'e, E>(
    executor: E,
    employee_id: u64,
    date: NaiveDate,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let hours = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(hours), 0) FROM overtime_requests \
         WHERE employee_id = ? AND ot_date = ? AND status = 'final'",
    )
    .bind(employee_id)
    .bind(date)
    .fetch_one(executor)
    .await?;

    Ok((hours * 60.0).round() as i64)
}

/// True when another entry of the employee overlaps `span`.
async fn overlaps_existing<'e, E>(
    executor: E,
    employee_id: u64,
    span: ClockSpan,
    exclude_id: Option<u64>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM time_clock_entries \
         WHERE employee_id = ? AND id <> ? \
         AND clock_in_time < ? AND COALESCE(clock_out_time, clock_in_time) > ?",
    )
    .bind(employee_id)
    .bind(exclude_id.unwrap_or(0))
    .bind(span.clock_out)
    .bind(span.clock_in)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

fn hours_json(hours: &HourBreakdown) -> serde_json::Value {
    json!({
        "regular_hours": hours.regular_hours(),
        "overtime_hours": hours.overtime_hours(),
        "unapproved_overtime_hours": hours.unapproved_overtime_hours(),
        "night_diff_hours": hours.night_diff_hours() + hours.night_diff_overtime_hours(),
    })
}

/// Clock in
#[utoipa::path(
    post,
    path = "/api/time-clock/clock-in",
    request_body = ClockInReq,
    responses(
        (status = 201, description = "Clocked in", body = Object, example = json!({
            "message": "Clocked in",
            "entry_id": 55,
            "clock_in_time": "2026-06-01T08:58:00",
            "office_location_id": 1
        })),
        (status = 400, description = "Missing or invalid coordinates"),
        (status = 403, description = "Outside every office geofence"),
        (status = 409, description = "Already clocked in")
    ),
    tag = "Time Clock",
    security(("bearer_auth" = []))
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: Option<web::Json<ClockInReq>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    let point = coordinates(&payload)?;

    let employee = load_employee(pool.get_ref(), employee_id).await?;

    let office_location_id = match employee.employee_type() {
        EmployeeType::OfficeBased => {
            let point = point.ok_or_else(|| {
                AppError::validation("Location is required for office-based employees")
            })?;
            let fences: Vec<_> = active_offices(pool.get_ref())
                .await
                .map_err(AppError::Db)?
                .iter()
                .map(OfficeLocation::geofence)
                .collect();

            match geo::resolve(point, &fences) {
                Some((fence, distance)) => {
                    info!(employee_id, office_id = fence.id, distance, "Clock-in inside geofence");
                    Some(fence.id)
                }
                None => {
                    let nearest = geo::nearest(point, &fences);
                    warn!(
                        employee_id,
                        nearest_office = nearest.map(|(f, _)| f.id),
                        distance = nearest.map(|(_, d)| d),
                        "Clock-in outside every geofence"
                    );
                    return Err(AppError::OutsideGeofence.into());
                }
            }
        }
        EmployeeType::ClientBased => None,
    };

    let now = local_now(&config);
    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    // serializes clock events of the same employee
    sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Db)?;

    let open = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM time_clock_entries WHERE employee_id = ? AND status = ? LIMIT 1",
    )
    .bind(employee_id)
    .bind(STATUS_CLOCKED_IN)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::Db)?;

    if open.is_some() {
        return Err(AppError::conflict("Already clocked in").into());
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO time_clock_entries
        (employee_id, clock_in_time, status, office_location_id, clock_in_latitude,
         clock_in_longitude, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(now)
    .bind(STATUS_CLOCKED_IN)
    .bind(office_location_id)
    .bind(point.map(|p| p.latitude))
    .bind(point.map(|p| p.longitude))
    .bind(&payload.notes)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to insert clock-in");
        AppError::Db(e)
    })?;

    tx.commit().await.map_err(AppError::Db)?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Clocked in",
        "entry_id": inserted.last_insert_id(),
        "clock_in_time": now,
        "office_location_id": office_location_id
    })))
}

/// Clock out
#[utoipa::path(
    post,
    path = "/api/time-clock/clock-out",
    responses(
        (status = 200, description = "Clocked out with derived hours", body = Object, example = json!({
            "message": "Clocked out",
            "entry_id": 55,
            "clock_out_time": "2026-06-01T18:02:00",
            "regular_hours": 8.0,
            "overtime_hours": 0.0,
            "unapproved_overtime_hours": 0.07,
            "night_diff_hours": 0.0
        })),
        (status = 409, description = "Not clocked in")
    ),
    tag = "Time Clock",
    security(("bearer_auth" = []))
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let employee = load_employee(pool.get_ref(), employee_id).await?;
    let now = local_now(&config);

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM time_clock_entries \
         WHERE employee_id = ? AND status = ? ORDER BY clock_in_time DESC LIMIT 1 FOR UPDATE"
    );
    let entry = sqlx::query_as::<_, TimeClockEntry>(&sql)
        .bind(employee_id)
        .bind(STATUS_CLOCKED_IN)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Db)?
        .ok_or_else(|| AppError::conflict("Not clocked in"))?;

    if now <= entry.clock_in_time {
        return Err(AppError::validation("Clock-out must be after clock-in").into());
    }
    let span = ClockSpan {
        clock_in: entry.clock_in_time,
        clock_out: now,
    };

    let hours = stamp_hours(&mut tx, &employee, span, &config).await?;

    info!(
        employee_id,
        entry_id = entry.id,
        regular = hours.regular_hours(),
        overtime = hours.overtime_hours(),
        "Clocked out"
    );

    let mut body = hours_json(&hours);
    body["message"] = json!("Clocked out");
    body["entry_id"] = json!(entry.id);
    body["clock_out_time"] = json!(now);

    EntryUpdate {
        entry_id: entry.id,
        span,
        notes: None,
        manual: false,
    }
    .apply(&mut tx, &hours)
    .await?;
    tx.commit().await.map_err(AppError::Db)?;

    Ok(HttpResponse::Ok().json(body))
}

/// Derived hours for a single closed entry.
async fn stamp_hours(
    tx: &mut sqlx::Transaction<'_, MySql>,
    employee: &Employee,
    span: ClockSpan,
    config: &Config,
) -> AppResult<HourBreakdown> {
    let ot_minutes = approved_ot_minutes(&mut **tx, employee.id, span.clock_in.date()).await?;
    Ok(entry_hours(
        span,
        ot_minutes,
        employee.eligibility(),
        &config.shift_rules(),
    ))
}

struct EntryUpdate {
    entry_id: u64,
    span: ClockSpan,
    notes: Option<String>,
    manual: bool,
}

impl EntryUpdate {
    async fn apply(
        &self,
        tx: &mut sqlx::Transaction<'_, MySql>,
        hours: &HourBreakdown,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE time_clock_entries
            SET clock_in_time = ?, clock_out_time = ?, regular_hours = ?, overtime_hours = ?,
                night_diff_hours = ?, status = ?, notes = COALESCE(?, notes),
                is_manual_entry = (is_manual_entry OR ?)
            WHERE id = ?
            "#,
        )
        .bind(self.span.clock_in)
        .bind(self.span.clock_out)
        .bind(hours.regular_hours())
        .bind(hours.overtime_hours())
        .bind(hours.night_diff_hours() + hours.night_diff_overtime_hours())
        .bind(STATUS_COMPLETED)
        .bind(&self.notes)
        .bind(self.manual)
        .bind(self.entry_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!(error = %e, entry_id = self.entry_id, "Failed to update time entry");
            AppError::Db(e)
        })?;
        Ok(())
    }
}

/// List time entries
#[utoipa::path(
    get,
    path = "/api/time-clock/entries",
    params(EntryFilter),
    responses(
        (status = 200, description = "Paginated time entries", body = EntryListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Time Clock",
    security(("bearer_auth" = []))
)]
pub async fn list_entries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EntryFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = match auth.employee_id() {
        Some(own) => Some(own),
        None => {
            auth.require_hr_or_admin()?;
            query.employee_id
        }
    };

    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(employee_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }
    if let Some(from) = query.from {
        where_sql.push_str(" AND clock_in_time >= ?");
        args.push(SqlValue::DateTime(from.and_time(chrono::NaiveTime::MIN)));
    }
    if let Some(to) = query.to.and_then(|d| d.succ_opt()) {
        where_sql.push_str(" AND clock_in_time < ?");
        args.push(SqlValue::DateTime(to.and_time(chrono::NaiveTime::MIN)));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    let count_sql = format!("SELECT COUNT(*) FROM time_clock_entries{}", where_sql);
    let total = bind_count_filters(sqlx::query_scalar::<_, i64>(&count_sql), &args)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count time entries");
            AppError::Db(e)
        })?;

    let data_sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM time_clock_entries{} ORDER BY clock_in_time DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let entries = bind_filters(sqlx::query_as::<_, TimeClockEntry>(&data_sql), &args)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch time entries");
            AppError::Db(e)
        })?;

    Ok(HttpResponse::Ok().json(EntryListResponse {
        data: entries,
        page,
        per_page,
        total,
    }))
}

/// Add a manual time entry (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/time-clock/entries",
    request_body = ManualEntryReq,
    responses(
        (status = 201, description = "Entry created", body = Object, example = json!({
            "message": "Entry created",
            "entry_id": 90,
            "regular_hours": 8.0,
            "overtime_hours": 0.0,
            "unapproved_overtime_hours": 0.0,
            "night_diff_hours": 0.0
        })),
        (status = 400, description = "Invalid times"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Overlaps an existing entry")
    ),
    tag = "Time Clock",
    security(("bearer_auth" = []))
)]
pub async fn create_manual_entry(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ManualEntryReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let span = validate_span(payload.clock_in_time, payload.clock_out_time)?;
    let employee = load_employee(pool.get_ref(), payload.employee_id).await?;

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    if overlaps_existing(&mut *tx, employee.id, span, None)
        .await
        .map_err(AppError::Db)?
    {
        return Err(AppError::conflict("Entry overlaps an existing time entry").into());
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO time_clock_entries
        (employee_id, clock_in_time, clock_out_time, status, is_manual_entry, notes)
        VALUES (?, ?, ?, ?, TRUE, ?)
        "#,
    )
    .bind(employee.id)
    .bind(span.clock_in)
    .bind(span.clock_out)
    .bind(STATUS_COMPLETED)
    .bind(&payload.notes)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = employee.id, "Failed to insert manual entry");
        AppError::Db(e)
    })?;

    let hours = stamp_hours(&mut tx, &employee, span, &config).await?;
    EntryUpdate {
        entry_id: inserted.last_insert_id(),
        span,
        notes: None,
        manual: true,
    }
    .apply(&mut tx, &hours)
    .await?;

    tx.commit().await.map_err(AppError::Db)?;

    info!(
        employee_id = employee.id,
        entry_id = inserted.last_insert_id(),
        created_by = auth.principal.id,
        "Manual time entry created"
    );

    let mut body = hours_json(&hours);
    body["message"] = json!("Entry created");
    body["entry_id"] = json!(inserted.last_insert_id());
    Ok(HttpResponse::Created().json(body))
}

/// Correct a time entry (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/time-clock/entries/{entry_id}",
    params(("entry_id", Path, description = "Time entry ID")),
    request_body = CorrectEntryReq,
    responses(
        (status = 200, description = "Entry corrected", body = Object, example = json!({
            "message": "Entry corrected",
            "entry_id": 55,
            "regular_hours": 8.0,
            "overtime_hours": 1.0,
            "unapproved_overtime_hours": 0.0,
            "night_diff_hours": 0.0
        })),
        (status = 400, description = "Invalid times"),
        (status = 404, description = "Entry not found"),
        (status = 409, description = "Overlaps an existing entry")
    ),
    tag = "Time Clock",
    security(("bearer_auth" = []))
)]
pub async fn correct_entry(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<CorrectEntryReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let entry_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(AppError::Db)?;

    let sql = format!("SELECT {ENTRY_COLUMNS} FROM time_clock_entries WHERE id = ? FOR UPDATE");
    let entry = sqlx::query_as::<_, TimeClockEntry>(&sql)
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Db)?
        .ok_or(AppError::NotFound("Time entry"))?;

    let clock_in = payload.clock_in_time.unwrap_or(entry.clock_in_time);
    let clock_out = payload
        .clock_out_time
        .or(entry.clock_out_time)
        .ok_or_else(|| AppError::validation("clock_out_time is required for an open entry"))?;
    let span = validate_span(clock_in, clock_out)?;

    if overlaps_existing(&mut *tx, entry.employee_id, span, Some(entry.id))
        .await
        .map_err(AppError::Db)?
    {
        return Err(AppError::conflict("Entry overlaps an existing time entry").into());
    }

    let employee = load_employee(pool.get_ref(), entry.employee_id).await?;
    let hours = stamp_hours(&mut tx, &employee, span, &config).await?;

    EntryUpdate {
        entry_id,
        span,
        notes: payload.notes.clone(),
        manual: true,
    }
    .apply(&mut tx, &hours)
    .await?;
    tx.commit().await.map_err(AppError::Db)?;

    info!(entry_id, corrected_by = auth.principal.id, "Time entry corrected");

    let mut body = hours_json(&hours);
    body["message"] = json!("Entry corrected");
    body["entry_id"] = json!(entry_id);
    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn coordinates_must_come_in_pairs() {
        let half = ClockInReq {
            latitude: Some(14.5),
            ..Default::default()
        };
        assert!(coordinates(&half).is_err());
        assert_eq!(coordinates(&ClockInReq::default()).unwrap(), None);

        let out_of_range = ClockInReq {
            latitude: Some(95.0),
            longitude: Some(121.0),
            notes: None,
        };
        assert!(coordinates(&out_of_range).is_err());
    }

    #[test]
    fn spans_must_be_positive_and_bounded() {
        assert!(validate_span(at(9, 0), at(18, 0)).is_ok());
        assert!(validate_span(at(18, 0), at(9, 0)).is_err());
        assert!(validate_span(at(9, 0), at(9, 0)).is_err());
        assert!(validate_span(at(9, 0), at(9, 0) + Duration::hours(25)).is_err());
    }
}
