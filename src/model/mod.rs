pub mod approval;
pub mod employee;
pub mod fund_request;
pub mod holiday;
pub mod leave_request;
pub mod loan;
pub mod office_location;
pub mod overtime;
pub mod payslip;
pub mod role;
pub mod time_clock;
pub mod user;
pub mod weekly_attendance;
