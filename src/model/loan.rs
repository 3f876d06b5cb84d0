use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Loan {
    #[schema(example = 1)]
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "company")]
    pub loan_type: String,
    #[schema(example = 10000.0)]
    pub principal: f64,
    #[schema(example = 1000.0)]
    pub per_cutoff_deduction: f64,
    #[schema(example = 9000.0)]
    pub balance: f64,
    #[schema(example = "2026-06-01", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "active")]
    pub status: String,
    #[schema(value_type = Option<String>)]
    pub created_at: Option<NaiveDateTime>,
}

pub const LOAN_ACTIVE: &str = "active";
pub const LOAN_PAID: &str = "paid";

impl Loan {
    /// Amount to deduct this cutoff; never more than what is still owed.
    pub fn next_deduction(&self) -> f64 {
        if self.status != LOAN_ACTIVE {
            return 0.0;
        }
        self.per_cutoff_deduction.min(self.balance).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(balance: f64, status: &str) -> Loan {
        Loan {
            id: 1,
            employee_id: 1,
            loan_type: "company".to_string(),
            principal: 3000.0,
            per_cutoff_deduction: 1000.0,
            balance,
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            status: status.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn last_installment_is_capped_at_balance() {
        assert_eq!(loan(3000.0, LOAN_ACTIVE).next_deduction(), 1000.0);
        assert_eq!(loan(250.0, LOAN_ACTIVE).next_deduction(), 250.0);
        assert_eq!(loan(250.0, LOAN_PAID).next_deduction(), 0.0);
    }
}
