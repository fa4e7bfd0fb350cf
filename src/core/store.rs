//! Storage collaborator consumed by the ledger operations.

use crate::core::error::Result;
use crate::core::model::{Loan, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fails with `NotFound` when the account does not exist.
    async fn get_account_balance(&self, account_id: &str) -> Result<Decimal>;

    /// Creates the account with an opening balance. Returns `false` if it already existed.
    async fn open_account(&self, account_id: &str, opening_balance: Decimal) -> Result<bool>;

    /// Applies `delta` to the balance and returns the new balance.
    ///
    /// Implementations must serialize concurrent adjustments to the same account.
    async fn adjust_account_balance(&self, account_id: &str, delta: Decimal) -> Result<Decimal>;

    async fn list_loans(&self) -> Result<Vec<Loan>>;

    async fn get_loan(&self, loan_id: &str) -> Result<Loan>;

    /// Inserts or replaces the loan, schedule and remaining principal as one unit.
    async fn save_loan(&self, loan: &Loan) -> Result<()>;

    async fn append_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Transactions touching the account with `timestamp >= since`, oldest first.
    async fn list_recent_transactions(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    async fn list_loans_for_account(&self, account_id: &str) -> Result<Vec<Loan>>;
}
