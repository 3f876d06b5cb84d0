//! Earnings and deductions for one employee and one cutoff.
//!
//! Earnings come only from the timesheet; government contributions are
//! supplied by the caller and never looked up here.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::loan::Loan;
use crate::timesheet::{DayType, Timesheet};

/// Night differential premium, as a fraction of the applicable hourly rate.
pub const NIGHT_DIFF_RATE: f64 = 0.10;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// (base, overtime) multipliers of the hourly rate for a day type.
pub fn multipliers(day_type: DayType) -> (f64, f64) {
    match day_type {
        DayType::RegularDay => (1.00, 1.25),
        DayType::RestDay => (1.30, 1.69),
        DayType::SpecialHoliday => (1.30, 1.69),
        DayType::RestDaySpecialHoliday => (1.50, 1.95),
        DayType::RegularHoliday => (2.00, 2.60),
        DayType::RestDayRegularHoliday => (2.60, 3.38),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayRates {
    pub daily_rate: f64,
    pub hourly_rate: f64,
}

impl PayRates {
    pub fn from_daily(daily_rate: f64, standard_hours: f64) -> Self {
        let hourly_rate = if standard_hours > 0.0 {
            daily_rate / standard_hours
        } else {
            0.0
        };
        Self {
            daily_rate,
            hourly_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EarningKind {
    Regular,
    Overtime,
    NightDiff,
    NightDiffOvertime,
    HolidayPay,
    PaidLeave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EarningLine {
    pub kind: EarningKind,
    /// `None` for lines that do not depend on the day type (leave, holiday pay).
    #[schema(value_type = Option<String>, example = "rest_day")]
    pub day_type: Option<DayType>,
    pub hours: f64,
    pub multiplier: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeductionLine {
    #[schema(example = "sss")]
    pub label: String,
    pub loan_id: Option<u64>,
    #[schema(example = 450.0)]
    pub amount: f64,
}

/// Contributions and other deductions supplied with the payslip request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeductionInput {
    #[serde(default)]
    pub sss: f64,
    #[serde(default)]
    pub philhealth: f64,
    #[serde(default)]
    pub pagibig: f64,
    #[serde(default)]
    pub withholding_tax: f64,
    #[serde(default)]
    pub other: Vec<DeductionLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayBreakdown {
    pub daily_rate: f64,
    pub hourly_rate: f64,
    pub earnings: Vec<EarningLine>,
    pub deductions: Vec<DeductionLine>,
    pub gross_pay: f64,
    pub total_deductions: f64,
    pub net_pay: f64,
}

impl PayBreakdown {
    /// Loan amortisations included in this payslip, as (loan id, amount).
    pub fn loan_payments(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.deductions
            .iter()
            .filter_map(|d| d.loan_id.map(|id| (id, d.amount)))
    }
}

#[derive(Default)]
struct Earnings(Vec<EarningLine>);

impl Earnings {
    fn add(
        &mut self,
        kind: EarningKind,
        day_type: Option<DayType>,
        hours: f64,
        multiplier: f64,
        hourly_rate: f64,
    ) {
        if hours <= 0.0 {
            return;
        }
        let amount = hours * hourly_rate * multiplier;
        match self
            .0
            .iter_mut()
            .find(|l| l.kind == kind && l.day_type == day_type)
        {
            Some(line) => {
                line.hours += hours;
                line.amount += amount;
            }
            None => self.0.push(EarningLine {
                kind,
                day_type,
                hours,
                multiplier,
                amount,
            }),
        }
    }

    fn finish(mut self) -> Vec<EarningLine> {
        for line in &mut self.0 {
            line.hours = round2(line.hours);
            line.amount = round2(line.amount);
        }
        self.0
    }
}

/// Earning lines for every paid hour of the timesheet, grouped by kind and
/// day type.
pub fn compute_earnings(timesheet: &Timesheet, rates: &PayRates) -> Vec<EarningLine> {
    let hourly = rates.hourly_rate;
    let mut earnings = Earnings::default();

    for day in &timesheet.days {
        let (base, ot) = multipliers(day.day_type);
        let day_type = Some(day.day_type);

        earnings.add(EarningKind::Regular, day_type, day.regular_hours, base, hourly);
        earnings.add(EarningKind::Overtime, day_type, day.overtime_hours, ot, hourly);
        earnings.add(
            EarningKind::NightDiff,
            day_type,
            day.night_diff_hours,
            base * NIGHT_DIFF_RATE,
            hourly,
        );
        earnings.add(
            EarningKind::NightDiffOvertime,
            day_type,
            day.night_diff_ot_hours,
            ot * NIGHT_DIFF_RATE,
            hourly,
        );
        earnings.add(EarningKind::HolidayPay, None, day.paid_holiday_hours, 1.0, hourly);
        earnings.add(EarningKind::PaidLeave, None, day.leave_hours, 1.0, hourly);
    }

    earnings.finish()
}

/// Full payslip: earnings, supplied deductions and loan amortisations.
///
/// Loans are taken in the given order, each `min(per_cutoff, balance)`, and
/// never push net pay below zero; a loan that no longer fits is deducted
/// partially or skipped for this cutoff. Supplied deductions larger than gross
/// pay are rejected.
pub fn compute_payslip(
    timesheet: &Timesheet,
    rates: &PayRates,
    input: &DeductionInput,
    loans: &[Loan],
) -> AppResult<PayBreakdown> {
    let earnings = compute_earnings(timesheet, rates);
    let gross_pay = round2(earnings.iter().map(|l| l.amount).sum());

    let mut deductions: Vec<DeductionLine> = [
        ("sss", input.sss),
        ("philhealth", input.philhealth),
        ("pagibig", input.pagibig),
        ("withholding_tax", input.withholding_tax),
    ]
    .into_iter()
    .filter(|(_, amount)| *amount > 0.0)
    .map(|(label, amount)| DeductionLine {
        label: label.to_string(),
        loan_id: None,
        amount: round2(amount),
    })
    .collect();

    deductions.extend(
        input
            .other
            .iter()
            .filter(|d| d.amount > 0.0)
            .map(|d| DeductionLine {
                label: d.label.clone(),
                loan_id: None,
                amount: round2(d.amount),
            }),
    );

    let supplied = round2(deductions.iter().map(|d| d.amount).sum());
    if supplied > gross_pay {
        return Err(AppError::validation(format!(
            "Deductions of {supplied:.2} exceed gross pay of {gross_pay:.2}"
        )));
    }

    let mut remaining = gross_pay - supplied;
    for loan in loans {
        let amount = round2(loan.next_deduction().min(remaining.max(0.0)));
        if amount <= 0.0 {
            continue;
        }
        remaining -= amount;
        deductions.push(DeductionLine {
            label: format!("loan:{}", loan.loan_type),
            loan_id: Some(loan.id),
            amount,
        });
    }

    let total_deductions = round2(deductions.iter().map(|d| d.amount).sum());
    Ok(PayBreakdown {
        daily_rate: rates.daily_rate,
        hourly_rate: round2(rates.hourly_rate),
        earnings,
        deductions,
        gross_pay,
        total_deductions,
        net_pay: round2(gross_pay - total_deductions).max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::loan::LOAN_ACTIVE;
    use crate::timesheet::{AttendanceDay, BiMonthlyPeriod, DayStatus, TimesheetTotals};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn day(d: u32, day_type: DayType, regular: f64, overtime: f64) -> AttendanceDay {
        AttendanceDay {
            date: date(d),
            day_name: date(d).format("%a").to_string(),
            day_type,
            status: DayStatus::Present,
            is_holiday: day_type.is_holiday(),
            holiday_name: None,
            is_rest_day: day_type.is_rest_day(),
            is_sunday: false,
            clock_in: None,
            clock_out: None,
            entry_ids: vec![],
            regular_hours: regular,
            overtime_hours: overtime,
            unapproved_overtime_hours: 0.0,
            night_diff_hours: 0.0,
            night_diff_ot_hours: 0.0,
            paid_holiday_hours: 0.0,
            leave_hours: 0.0,
            leave_type: None,
        }
    }

    fn sheet(days: Vec<AttendanceDay>) -> Timesheet {
        Timesheet {
            employee_id: 1,
            period: BiMonthlyPeriod::containing(date(1)),
            days,
            totals: TimesheetTotals::default(),
        }
    }

    fn loan(id: u64, per_cutoff: f64, balance: f64) -> Loan {
        Loan {
            id,
            employee_id: 1,
            loan_type: "company".to_string(),
            principal: 5000.0,
            per_cutoff_deduction: per_cutoff,
            balance,
            start_date: date(1),
            status: LOAN_ACTIVE.to_string(),
            created_at: None,
        }
    }

    // daily 800 over 8 hours => 100/hour
    fn rates() -> PayRates {
        PayRates::from_daily(800.0, 8.0)
    }

    fn amount_of(lines: &[EarningLine], kind: EarningKind, day_type: Option<DayType>) -> f64 {
        lines
            .iter()
            .find(|l| l.kind == kind && l.day_type == day_type)
            .map(|l| l.amount)
            .unwrap_or(0.0)
    }

    #[test]
    fn regular_and_overtime_on_a_regular_day() {
        let ts = sheet(vec![day(1, DayType::RegularDay, 8.0, 2.0)]);
        let lines = compute_earnings(&ts, &rates());

        assert_eq!(amount_of(&lines, EarningKind::Regular, Some(DayType::RegularDay)), 800.0);
        assert_eq!(amount_of(&lines, EarningKind::Overtime, Some(DayType::RegularDay)), 250.0);
    }

    #[test]
    fn premium_days_use_their_multipliers() {
        let ts = sheet(vec![
            day(7, DayType::RestDay, 8.0, 1.0),
            day(12, DayType::RegularHoliday, 8.0, 0.0),
            day(14, DayType::RestDayRegularHoliday, 8.0, 0.0),
        ]);
        let lines = compute_earnings(&ts, &rates());

        assert_eq!(amount_of(&lines, EarningKind::Regular, Some(DayType::RestDay)), 1040.0);
        assert_eq!(amount_of(&lines, EarningKind::Overtime, Some(DayType::RestDay)), 169.0);
        assert_eq!(amount_of(&lines, EarningKind::Regular, Some(DayType::RegularHoliday)), 1600.0);
        assert_eq!(
            amount_of(&lines, EarningKind::Regular, Some(DayType::RestDayRegularHoliday)),
            2080.0
        );
    }

    #[test]
    fn night_differential_is_ten_percent_of_applicable_rate() {
        let mut d = day(1, DayType::RegularDay, 8.0, 1.0);
        d.night_diff_hours = 2.0;
        d.night_diff_ot_hours = 1.0;
        let mut rest = day(7, DayType::RestDay, 8.0, 0.0);
        rest.night_diff_hours = 1.0;

        let lines = compute_earnings(&sheet(vec![d, rest]), &rates());
        assert_eq!(amount_of(&lines, EarningKind::NightDiff, Some(DayType::RegularDay)), 20.0);
        assert_eq!(
            amount_of(&lines, EarningKind::NightDiffOvertime, Some(DayType::RegularDay)),
            12.5
        );
        assert_eq!(amount_of(&lines, EarningKind::NightDiff, Some(DayType::RestDay)), 13.0);
    }

    #[test]
    fn unworked_holiday_and_leave_are_paid_at_base_rate() {
        let mut holiday = day(12, DayType::RegularHoliday, 0.0, 0.0);
        holiday.status = DayStatus::Holiday;
        holiday.paid_holiday_hours = 8.0;
        let mut leave = day(2, DayType::RegularDay, 0.0, 0.0);
        leave.status = DayStatus::OnLeave;
        leave.leave_hours = 8.0;

        let lines = compute_earnings(&sheet(vec![holiday, leave]), &rates());
        assert_eq!(amount_of(&lines, EarningKind::HolidayPay, None), 800.0);
        assert_eq!(amount_of(&lines, EarningKind::PaidLeave, None), 800.0);
        // no zero-hour lines
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn lines_are_grouped_across_days() {
        let ts = sheet(vec![
            day(1, DayType::RegularDay, 8.0, 0.0),
            day(2, DayType::RegularDay, 7.5, 0.0),
        ]);
        let lines = compute_earnings(&ts, &rates());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].hours, 15.5);
        assert_eq!(lines[0].amount, 1550.0);
    }

    #[test]
    fn payslip_applies_contributions_and_loans() {
        let ts = sheet(vec![
            day(1, DayType::RegularDay, 8.0, 0.0),
            day(2, DayType::RegularDay, 8.0, 0.0),
        ]);
        let input = DeductionInput {
            sss: 100.0,
            philhealth: 50.0,
            pagibig: 0.0,
            withholding_tax: 0.0,
            other: vec![],
        };
        let loans = [loan(1, 500.0, 300.0), loan(2, 200.0, 1000.0)];

        let slip = compute_payslip(&ts, &rates(), &input, &loans).unwrap();
        assert_eq!(slip.gross_pay, 1600.0);
        // 100 + 50 + 300 (capped at balance) + 200
        assert_eq!(slip.total_deductions, 650.0);
        assert_eq!(slip.net_pay, 950.0);
        assert_eq!(slip.loan_payments().collect::<Vec<_>>(), vec![(1, 300.0), (2, 200.0)]);
        // pagibig of zero is omitted
        assert!(slip.deductions.iter().all(|d| d.label != "pagibig"));
    }

    #[test]
    fn loans_never_push_net_pay_negative() {
        let ts = sheet(vec![day(1, DayType::RegularDay, 8.0, 0.0)]);
        let input = DeductionInput {
            sss: 500.0,
            ..DeductionInput::default()
        };
        let loans = [loan(1, 200.0, 5000.0), loan(2, 200.0, 5000.0)];

        // 800 gross - 500 sss leaves 300 for loans
        let slip = compute_payslip(&ts, &rates(), &input, &loans).unwrap();
        assert_eq!(slip.net_pay, 0.0);
        assert_eq!(slip.loan_payments().collect::<Vec<_>>(), vec![(1, 200.0), (2, 100.0)]);
    }

    #[test]
    fn contributions_above_gross_are_rejected() {
        let ts = sheet(vec![day(1, DayType::RegularDay, 8.0, 0.0)]);
        let input = DeductionInput {
            sss: 1000.0,
            ..DeductionInput::default()
        };

        // 800 gross
        let err = compute_payslip(&ts, &rates(), &input, &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let exact = DeductionInput {
            sss: 800.0,
            ..DeductionInput::default()
        };
        let slip = compute_payslip(&ts, &rates(), &exact, &[loan(1, 200.0, 1000.0)]).unwrap();
        assert_eq!(slip.net_pay, 0.0);
        assert_eq!(slip.loan_payments().count(), 0);
    }

    #[test]
    fn hourly_rate_guards_zero_standard_hours() {
        assert_eq!(PayRates::from_daily(800.0, 0.0).hourly_rate, 0.0);
    }
}
