use crate::api::approvals::DecisionReq;
use crate::api::employee::{CreateEmployee, EmployeeListResponse};
use crate::api::fund_requests::{CreateFundRequest, FundListResponse};
use crate::api::holidays::CreateHoliday;
use crate::api::leave_request::{
    CreateLeave, LeaveFilter, LeaveListResponse, LeaveResponse, RefreshCredits,
};
use crate::api::loans::CreateLoan;
use crate::api::office_locations::CreateOfficeLocation;
use crate::api::overtime::{CreateOvertime, OvertimeListResponse};
use crate::api::overtime_groups::CreateOvertimeGroup;
use crate::api::payslips::GeneratePayslip;
use crate::api::rest_days::{RestDayList, SetRestDays};
use crate::api::time_clock::{ClockInReq, CorrectEntryReq, EntryListResponse, ManualEntryReq};
use crate::api::users::{CreateUserReq, DeleteUserReq, UpdateStatusReq, UpdateUserReq};
use crate::model::approval::ApprovalStatus;
use crate::model::employee::{EmployeeResponse, EmployeeType};
use crate::model::fund_request::FundRequest;
use crate::model::holiday::{Holiday, HolidayKind};
use crate::model::leave_request::{LeaveCredit, LeaveType};
use crate::model::loan::Loan;
use crate::model::office_location::OfficeLocation;
use crate::model::overtime::{OvertimeGroup, OvertimeRequest};
use crate::model::role::Role;
use crate::model::time_clock::TimeClockEntry;
use crate::model::user::UserResponse;
use crate::models::{ChangePasswordReq, EmployeeLoginReq, LoginReqDto, LoginResponse};
use crate::payroll::calculator::{
    DeductionInput, DeductionLine, EarningKind, EarningLine, PayBreakdown,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

/// Registers the `bearer_auth` scheme referenced by protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hrpay API",
        version = "0.1.0",
        description = r#"
## Payroll and attendance service

Semi-monthly payroll for a workforce paid by the day.

### Features
- **Time clock**: clock-in/out with office geofencing, manual entries and corrections
- **Timesheets**: cutoff timesheets recomputed from clock events, holidays, rest days, leave and final overtime
- **Approvals**: three-stage overtime and fund request workflows
- **Leave**: requests, approval and yearly credits
- **Payroll**: loans and payslips with a full earnings and deductions breakdown

### Security
Protected endpoints take a **JWT Bearer** access token from `/auth/login`
(staff) or `/auth/employee-login` (employees). Role and account status are
re-checked on every request. Salary figures require salary access.

### Conventions
- Dates are `YYYY-MM-DD`, times are local to the configured offset
- Cutoffs run 1st-15th and 16th-end of month
- List endpoints are paginated with `page` and `per_page`
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::employee_login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::users::create_user,
        crate::api::users::delete_user,
        crate::api::users::update_status,
        crate::api::users::update_user,
        crate::api::users::list_users,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::my_profile,
        crate::api::employee::change_password,

        crate::api::time_clock::clock_in,
        crate::api::time_clock::clock_out,
        crate::api::time_clock::list_entries,
        crate::api::time_clock::create_manual_entry,
        crate::api::time_clock::correct_entry,

        crate::api::timesheet::get_timesheet,
        crate::api::timesheet::generate_timesheet,
        crate::api::timesheet::timesheet_drift,

        crate::api::holidays::list_holidays,
        crate::api::holidays::create_holiday,
        crate::api::holidays::delete_holiday,

        crate::api::rest_days::set_rest_days,
        crate::api::rest_days::list_rest_days,

        crate::api::office_locations::list_office_locations,
        crate::api::office_locations::create_office_location,
        crate::api::office_locations::deactivate_office_location,

        crate::api::overtime_groups::list_overtime_groups,
        crate::api::overtime_groups::create_overtime_group,

        crate::api::overtime::create_overtime,
        crate::api::overtime::list_overtime,
        crate::api::overtime::get_overtime,
        crate::api::overtime::approve_overtime,
        crate::api::overtime::reject_overtime,

        crate::api::fund_requests::create_fund_request,
        crate::api::fund_requests::list_fund_requests,
        crate::api::fund_requests::get_fund_request,
        crate::api::fund_requests::approve_fund_request,
        crate::api::fund_requests::reject_fund_request,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::get_employee_leave_credits,
        crate::api::leave_request::refresh_employee_leave_balances,

        crate::api::loans::create_loan,
        crate::api::loans::list_loans,
        crate::api::loans::get_loan,

        crate::api::payslips::generate_payslip,
        crate::api::payslips::list_payslips,
        crate::api::payslips::get_payslip
    ),
    components(
        schemas(
            LoginReqDto,
            EmployeeLoginReq,
            ChangePasswordReq,
            LoginResponse,
            Role,
            CreateUserReq,
            DeleteUserReq,
            UpdateStatusReq,
            UpdateUserReq,
            UserResponse,
            EmployeeType,
            CreateEmployee,
            EmployeeResponse,
            EmployeeListResponse,
            ClockInReq,
            ManualEntryReq,
            CorrectEntryReq,
            TimeClockEntry,
            EntryListResponse,
            HolidayKind,
            Holiday,
            CreateHoliday,
            SetRestDays,
            RestDayList,
            OfficeLocation,
            CreateOfficeLocation,
            OvertimeGroup,
            CreateOvertimeGroup,
            ApprovalStatus,
            DecisionReq,
            OvertimeRequest,
            CreateOvertime,
            OvertimeListResponse,
            FundRequest,
            CreateFundRequest,
            FundListResponse,
            LeaveType,
            CreateLeave,
            LeaveFilter,
            LeaveResponse,
            LeaveListResponse,
            LeaveCredit,
            RefreshCredits,
            Loan,
            CreateLoan,
            GeneratePayslip,
            DeductionInput,
            EarningKind,
            EarningLine,
            DeductionLine,
            PayBreakdown
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Users", description = "Staff accounts"),
        (name = "Employee", description = "Employee records and self-service"),
        (name = "Time Clock", description = "Clock events and entry corrections"),
        (name = "Timesheet", description = "Cutoff timesheets and snapshots"),
        (name = "Calendar", description = "Holidays and rest days"),
        (name = "Office Locations", description = "Geofences for office-based employees"),
        (name = "Overtime", description = "Overtime groups and requests"),
        (name = "Fund Requests", description = "Fund request approvals"),
        (name = "Leave", description = "Leave requests and credits"),
        (name = "Payroll", description = "Loans and payslips"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_registers_bearer_scheme_and_paths() {
        let doc = ApiDoc::openapi();
        let schemes = doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("bearer_auth"))
            .unwrap_or(false);
        assert!(schemes);
        assert!(doc.paths.paths.contains_key("/api/time-clock/clock-in"));
        assert!(doc.paths.paths.contains_key("/api/payslips/{payslip_id}"));
    }
}
