pub mod approvals;
pub mod employee;
pub mod fund_requests;
pub mod holidays;
pub mod leave_request;
pub mod loans;
pub mod office_locations;
pub mod overtime;
pub mod overtime_groups;
pub mod payslips;
pub mod rest_days;
pub mod time_clock;
pub mod timesheet;
pub mod users;
