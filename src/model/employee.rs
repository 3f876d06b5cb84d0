use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::timesheet::Eligibility;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EmployeeType {
    /// Reports to a company office; clock-ins are geofenced.
    OfficeBased,
    /// Deployed at a client site; location is recorded, not enforced.
    ClientBased,
}

/// Column list matching [`Employee`]; the password hash is never selected.
pub const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, middle_name, last_name, email, \
     employee_type, job_level, daily_rate, monthly_rate, overtime_group_id, eligible_for_ot, \
     eligible_for_nd, hire_date, is_active, first_login_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub employee_type: String,
    pub job_level: Option<String>,
    pub daily_rate: f64,
    pub monthly_rate: Option<f64>,
    pub overtime_group_id: Option<u64>,
    pub eligible_for_ot: bool,
    pub eligible_for_nd: bool,
    pub hire_date: NaiveDate,
    pub is_active: bool,
    pub first_login_at: Option<NaiveDateTime>,
}

impl Employee {
    pub fn employee_type(&self) -> EmployeeType {
        self.employee_type
            .parse()
            .unwrap_or(EmployeeType::OfficeBased)
    }

    pub fn eligibility(&self) -> Eligibility {
        Eligibility {
            overtime: self.eligible_for_ot,
            night_diff: self.eligible_for_nd,
        }
    }

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Rates are only shown to callers with salary access.
    pub fn into_response(self, with_salary: bool) -> EmployeeResponse {
        let full_name = self.full_name();
        EmployeeResponse {
            id: self.id,
            employee_code: self.employee_code,
            full_name,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: self.email,
            employee_type: self.employee_type,
            job_level: self.job_level,
            daily_rate: with_salary.then_some(self.daily_rate),
            monthly_rate: if with_salary { self.monthly_rate } else { None },
            overtime_group_id: self.overtime_group_id,
            eligible_for_ot: self.eligible_for_ot,
            eligible_for_nd: self.eligible_for_nd,
            hire_date: self.hire_date,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "full_name": "Juan Dela Cruz",
        "first_name": "Juan",
        "middle_name": null,
        "last_name": "Dela Cruz",
        "email": "juan@company.ph",
        "employee_type": "office-based",
        "job_level": "rank-and-file",
        "daily_rate": 750.0,
        "monthly_rate": null,
        "overtime_group_id": 2,
        "eligible_for_ot": true,
        "eligible_for_nd": true,
        "hire_date": "2024-01-01",
        "is_active": true
    })
)]
pub struct EmployeeResponse {
    pub id: u64,
    pub employee_code: String,
    pub full_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub employee_type: String,
    pub job_level: Option<String>,
    pub daily_rate: Option<f64>,
    pub monthly_rate: Option<f64>,
    pub overtime_group_id: Option<u64>,
    pub eligible_for_ot: bool,
    pub eligible_for_nd: bool,
    #[schema(value_type = String)]
    pub hire_date: NaiveDate,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> Employee {
        Employee {
            id: 1,
            employee_code: "EMP-001".to_string(),
            first_name: "Juan".to_string(),
            middle_name: Some("Santos".to_string()),
            last_name: "Dela Cruz".to_string(),
            email: None,
            employee_type: "client-based".to_string(),
            job_level: None,
            daily_rate: 750.0,
            monthly_rate: Some(19_500.0),
            overtime_group_id: None,
            eligible_for_ot: true,
            eligible_for_nd: false,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            is_active: true,
            first_login_at: None,
        }
    }

    #[test]
    fn rates_hidden_without_salary_access() {
        let hidden = employee().into_response(false);
        assert_eq!(hidden.daily_rate, None);
        assert_eq!(hidden.monthly_rate, None);

        let shown = employee().into_response(true);
        assert_eq!(shown.daily_rate, Some(750.0));
        assert_eq!(shown.full_name, "Juan Santos Dela Cruz");
    }

    #[test]
    fn employee_type_uses_kebab_case() {
        assert_eq!(employee().employee_type(), EmployeeType::ClientBased);
        assert_eq!(EmployeeType::OfficeBased.as_ref(), "office-based");
        assert!(!employee().eligibility().night_diff);
    }
}
