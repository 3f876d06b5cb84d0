//! Payslip computation from a recomputed timesheet.

pub mod calculator;

pub use calculator::{DeductionInput, PayBreakdown, PayRates, compute_payslip};
