//! Loads everything `generate_timesheet` needs for one employee and period.

use chrono::{Duration, NaiveDate};
use sqlx::{Executor, MySql, MySqlPool};

use crate::error::{AppError, AppResult};
use crate::model::employee::{EMPLOYEE_COLUMNS, Employee};
use crate::model::holiday::HolidayKind;
use crate::model::leave_request::LeaveType;

use super::allocator::ShiftRules;
use super::classifier::{CalendarHoliday, RestDaySchedule};
use super::generator::{
    ApprovedLeave, ApprovedOvertime, ClockEntryInput, HOLIDAY_LOOKBACK_DAYS, Timesheet,
    TimesheetInput, generate_timesheet,
};
use super::period::BiMonthlyPeriod;

/// Owned inputs of one timesheet, as read from the database.
#[derive(Debug, Clone)]
pub struct TimesheetSources {
    pub employee: Employee,
    pub period: BiMonthlyPeriod,
    pub history_start: NaiveDate,
    pub entries: Vec<ClockEntryInput>,
    pub holidays: Vec<CalendarHoliday>,
    pub rest_days: RestDaySchedule,
    pub overtime: Vec<ApprovedOvertime>,
    pub leave: Vec<ApprovedLeave>,
}

impl TimesheetSources {
    pub fn input<'a>(&'a self, rules: &'a ShiftRules) -> TimesheetInput<'a> {
        TimesheetInput {
            employee_id: self.employee.id,
            eligibility: self.employee.eligibility(),
            period: self.period,
            entries: &self.entries,
            history_start: self.history_start,
            holidays: &self.holidays,
            rest_days: &self.rest_days,
            overtime: &self.overtime,
            leave: &self.leave,
            rules,
        }
    }

    pub fn generate(&self, rules: &ShiftRules) -> Timesheet {
        generate_timesheet(&self.input(rules))
    }
}

pub async fn load_employee(pool: &MySqlPool, employee_id: u64) -> AppResult<Employee> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Employee"))
}

/// Reads clock entries, holidays, rest days, final overtime and approved leave
/// for `period`. Entries, holidays and rest days reach back far enough to
/// evaluate the holiday-pay rule on the first days of the period.
pub async fn load_sources(
    pool: &MySqlPool,
    employee_id: u64,
    period: BiMonthlyPeriod,
) -> AppResult<TimesheetSources> {
    let employee = load_employee(pool, employee_id).await?;
    let history_start = period.start - Duration::days(HOLIDAY_LOOKBACK_DAYS);
    let until = period.end + Duration::days(1);

    let entries = sqlx::query_as::<_, (u64, chrono::NaiveDateTime, Option<chrono::NaiveDateTime>)>(
        r#"
        SELECT id, clock_in_time, clock_out_time
        FROM time_clock_entries
        WHERE employee_id = ?
          AND clock_in_time >= ?
          AND clock_in_time < ?
        ORDER BY clock_in_time
        "#,
    )
    .bind(employee_id)
    .bind(history_start.and_hms_opt(0, 0, 0))
    .bind(until.and_hms_opt(0, 0, 0))
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(id, clock_in, clock_out)| ClockEntryInput {
        id,
        clock_in,
        clock_out,
    })
    .collect();

    let holidays = load_holidays(pool, history_start, period.end).await?;

    // look-back days in the previous cutoff follow that cutoff's own schedule
    let rest_days = load_rest_schedule(pool, employee_id, history_start, period.end).await?;

    // only fully approved overtime is paid
    let overtime = sqlx::query_as::<_, (NaiveDate, f64)>(
        r#"
        SELECT ot_date, hours
        FROM overtime_requests
        WHERE employee_id = ?
          AND status = 'final'
          AND ot_date BETWEEN ? AND ?
        "#,
    )
    .bind(employee_id)
    .bind(period.start)
    .bind(period.end)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(date, hours)| ApprovedOvertime {
        date,
        minutes: (hours * 60.0).round() as i64,
    })
    .collect();

    let leave = sqlx::query_as::<_, (NaiveDate, NaiveDate, String)>(
        r#"
        SELECT start_date, end_date, leave_type
        FROM leave_requests
        WHERE employee_id = ?
          AND status = 'approved'
          AND start_date <= ?
          AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(period.end)
    .bind(history_start)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(start, end, leave_type)| {
        let paid = match leave_type.parse::<LeaveType>() {
            Ok(t) => t.is_paid(),
            Err(_) => {
                tracing::warn!(employee_id, %leave_type, "Unknown leave type treated as unpaid");
                false
            }
        };
        ApprovedLeave {
            start,
            end,
            leave_type,
            paid,
        }
    })
    .collect();

    Ok(TimesheetSources {
        employee,
        period,
        history_start,
        entries,
        holidays,
        rest_days,
        overtime,
        leave,
    })
}

/// Rest-day rows of one employee between `from` and `to`.
pub async fn load_rest_schedule<'e, E>(
    executor: E,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<RestDaySchedule>
where
    E: Executor<'e, Database = MySql>,
{
    let dates = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT rest_date FROM rest_days WHERE employee_id = ? AND rest_date BETWEEN ? AND ?",
    )
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;
    Ok(RestDaySchedule::explicit(dates))
}

pub async fn load_holidays<'e, E>(
    executor: E,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<CalendarHoliday>>
where
    E: Executor<'e, Database = MySql>,
{
    let rows = sqlx::query_as::<_, (NaiveDate, String, String)>(
        "SELECT holiday_date, name, kind FROM holidays WHERE holiday_date BETWEEN ? AND ?",
    )
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(date, name, kind)| match kind.parse::<HolidayKind>() {
            Ok(kind) => Some(CalendarHoliday { date, name, kind }),
            Err(_) => {
                tracing::warn!(%date, %name, %kind, "Skipping holiday with unknown kind");
                None
            }
        })
        .collect())
}
