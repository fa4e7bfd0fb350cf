//! Ledger entities shared by the calculator, the settlement cycle and the projector.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One scheduled payment obligation within a loan's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub due_date: DateTime<Utc>,
    pub amount: Decimal,
    pub principal_part: Decimal,
    pub interest_part: Decimal,
    pub paid: bool,
    /// Late fee appended by settlement rather than part of the amortization.
    #[serde(default)]
    pub penalty: bool,
}

impl Installment {
    /// A late fee: carries no principal, the whole amount is interest.
    pub fn penalty(due_date: DateTime<Utc>, amount: Decimal) -> Self {
        Self {
            due_date,
            amount,
            principal_part: Decimal::ZERO,
            interest_part: amount,
            paid: false,
            penalty: true,
        }
    }

    pub fn is_penalty(&self) -> bool {
        self.penalty
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.paid && self.due_date < now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub principal: Decimal,
    pub annual_rate_percent: Decimal,
    pub term_months: i32,
    pub start_date: DateTime<Utc>,
    /// Insertion order; penalties are appended, so not strictly chronological.
    pub schedule: Vec<Installment>,
    pub remaining_principal: Decimal,
}

impl Loan {
    pub fn is_repaid(&self) -> bool {
        self.remaining_principal.is_zero()
    }

    pub fn outstanding_amount(&self) -> Decimal {
        self.schedule
            .iter()
            .filter(|i| !i.paid)
            .map(|i| i.amount)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Installment debited by settlement.
    LoanPayment,
    /// Principal credited on approval.
    LoanDisbursement,
    /// Account-to-account movement recorded by the surrounding bank
    /// (manual or card transfers). Never emitted here, but it feeds the
    /// cash-flow averages of balance forecasts.
    Transfer,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TransactionKind::LoanPayment => "loan_payment",
                TransactionKind::LoanDisbursement => "loan_disbursement",
                TransactionKind::Transfer => "transfer",
            }
        )
    }
}

/// Immutable record of money moving into or out of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from_account_id: Option<String>,
    pub to_account_id: Option<String>,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub kind: TransactionKind,
    pub description: Option<String>,
}

impl Transaction {
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn loan_payment(loan: &Loan, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Self::new_id(),
            from_account_id: Some(loan.account_id.clone()),
            to_account_id: None,
            amount,
            timestamp,
            kind: TransactionKind::LoanPayment,
            description: Some(format!("Automatic loan payment (loan {})", loan.id)),
        }
    }

    pub fn loan_disbursement(loan: &Loan, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Self::new_id(),
            from_account_id: None,
            to_account_id: Some(loan.account_id.clone()),
            amount: loan.principal,
            timestamp,
            kind: TransactionKind::LoanDisbursement,
            description: Some(format!("Loan disbursement (loan {})", loan.id)),
        }
    }

    pub fn involves(&self, account_id: &str) -> bool {
        self.from_account_id.as_deref() == Some(account_id)
            || self.to_account_id.as_deref() == Some(account_id)
    }
}

/// Projected balance at the end of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceForecast {
    pub account_id: String,
    pub current_balance: Decimal,
    pub horizon_days: i64,
    pub avg_daily_inflow: Decimal,
    pub avg_daily_outflow: Decimal,
    pub points: Vec<ForecastPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_penalty_installment_is_all_interest() {
        let due = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
        let penalty = Installment::penalty(due, dec!(50.00));
        assert_eq!(penalty.principal_part, Decimal::ZERO);
        assert_eq!(penalty.interest_part, dec!(50.00));
        assert!(penalty.is_penalty());
        assert!(!penalty.paid);
    }

    #[test]
    fn test_overdue_is_strictly_before_now() {
        let due = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
        let mut installment = Installment::penalty(due, dec!(1));
        assert!(!installment.is_overdue(due));
        assert!(installment.is_overdue(due + chrono::Duration::seconds(1)));
        installment.paid = true;
        assert!(!installment.is_overdue(due + chrono::Duration::days(1)));
    }

    #[test]
    fn test_transaction_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::LoanPayment).unwrap();
        assert_eq!(json, "\"loan_payment\"");
        assert_eq!(TransactionKind::LoanDisbursement.to_string(), "loan_disbursement");
    }

    #[test]
    fn test_interest_only_installment_is_not_a_penalty() {
        let due = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
        let installment = Installment {
            due_date: due,
            amount: dec!(12.50),
            principal_part: Decimal::ZERO,
            interest_part: dec!(12.50),
            paid: false,
            penalty: false,
        };
        assert!(!installment.is_penalty());
    }

    #[test]
    fn test_installment_without_penalty_flag_deserializes() {
        let json = r#"{"due_date":"2025-01-08T00:00:00Z","amount":"10","principal_part":"0","interest_part":"10","paid":false}"#;
        let installment: Installment = serde_json::from_str(json).unwrap();
        assert!(!installment.penalty);
    }

    #[test]
    fn test_external_transfer_record_deserializes() {
        let json = r#"{"id":"tx-9","from_account_id":"acc-2","to_account_id":"acc-1","amount":"75.00","timestamp":"2025-01-08T10:00:00Z","kind":"transfer","description":null}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionKind::Transfer);
        assert!(tx.involves("acc-1"));
        assert!(tx.involves("acc-2"));
    }
}
