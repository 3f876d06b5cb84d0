use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::{QueryAs, QueryScalar};

use crate::error::{AppError, AppResult};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn to_sql_value(column: &str, value: &Value) -> AppResult<SqlValue> {
    Ok(match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                SqlValue::DateTime(dt)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(AppError::validation(format!("{column}: number out of range")));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => {
            return Err(AppError::validation(format!(
                "{column}: unsupported JSON value type"
            )));
        }
    })
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `allowed` may be updated; anything else is rejected so
/// callers can never touch columns such as passwords or ids.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> AppResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    if let Some(bad) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(AppError::validation(format!("Field '{bad}' cannot be updated")));
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);
    for (column, value) in obj {
        values.push(to_sql_value(column, value)?);
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

macro_rules! bind_sql_value {
    ($query:expr, $value:expr) => {
        match $value {
            SqlValue::String(v) => $query.bind(v),
            SqlValue::I64(v) => $query.bind(v),
            SqlValue::U64(v) => $query.bind(v),
            SqlValue::F64(v) => $query.bind(v),
            SqlValue::Bool(v) => $query.bind(v),
            SqlValue::Date(v) => $query.bind(v),
            SqlValue::DateTime(v) => $query.bind(v),
            SqlValue::Null => $query.bind(None::<String>),
        }
    };
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = bind_sql_value!(query, value);
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Binds filter values collected while building a dynamic `WHERE` clause.
pub fn bind_filters<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values.iter().cloned() {
        query = bind_sql_value!(query, value);
    }
    query
}

pub fn bind_count_filters<'q>(
    mut query: QueryScalar<'q, MySql, i64, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, i64, MySqlArguments> {
    for value in values.iter().cloned() {
        query = bind_sql_value!(query, value);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[&str] = &["first_name", "daily_rate", "hire_date", "eligible_for_ot"];

    #[test]
    fn builds_update_for_allowed_columns() {
        let payload = json!({ "first_name": "Ana", "daily_rate": 810.5, "hire_date": "2024-02-01" });
        let update = build_update_sql("employees", &payload, ALLOWED, "id", 7).unwrap();

        assert!(update.sql.starts_with("UPDATE employees SET "));
        assert!(update.sql.ends_with(" WHERE id = ?"));
        assert_eq!(update.values.len(), 4);
        assert!(update.values.contains(&SqlValue::F64(810.5)));
        assert!(
            update
                .values
                .contains(&SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()))
        );
        assert_eq!(update.values.last(), Some(&SqlValue::U64(7)));
    }

    #[test]
    fn rejects_columns_outside_allow_list() {
        let payload = json!({ "password": "x" });
        let err = build_update_sql("employees", &payload, ALLOWED, "id", 1).unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn rejects_empty_and_nested_payloads() {
        assert!(build_update_sql("employees", &json!({}), ALLOWED, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1]), ALLOWED, "id", 1).is_err());
        assert!(
            build_update_sql("employees", &json!({ "first_name": ["a"] }), ALLOWED, "id", 1)
                .is_err()
        );
    }
}
