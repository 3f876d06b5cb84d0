//! Attendance reconciliation: clock events → day classification → hour
//! allocation → period totals.

pub mod allocator;
pub mod classifier;
pub mod generator;
pub mod period;
pub mod reconcile;
pub mod source;

pub use allocator::{ClockSpan, Eligibility, HourBreakdown, ShiftRules};
pub use classifier::{CalendarHoliday, DayType, RestDaySchedule};
pub use generator::{AttendanceDay, DayStatus, Timesheet, TimesheetTotals, generate_timesheet};
pub use period::BiMonthlyPeriod;
