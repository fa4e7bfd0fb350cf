use crate::core::error::{LedgerError, Result};
use crate::core::model::{Loan, Transaction};
use crate::core::store::LedgerStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<String, Decimal>,
    loans: BTreeMap<String, Loan>,
    transactions: Vec<Transaction>,
}

/// In-memory ledger. One async mutex guards all state, so every balance
/// adjustment is an atomic read-modify-write.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction recorded so far, in append order.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.inner.lock().await.transactions.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get_account_balance(&self, account_id: &str) -> Result<Decimal> {
        let state = self.inner.lock().await;
        state
            .balances
            .get(account_id)
            .copied()
            .ok_or_else(|| LedgerError::account_not_found(account_id))
    }

    async fn open_account(&self, account_id: &str, opening_balance: Decimal) -> Result<bool> {
        let mut state = self.inner.lock().await;
        if state.balances.contains_key(account_id) {
            return Ok(false);
        }
        state
            .balances
            .insert(account_id.to_string(), opening_balance);
        debug!(account_id, %opening_balance, "Opened account");
        Ok(true)
    }

    async fn adjust_account_balance(&self, account_id: &str, delta: Decimal) -> Result<Decimal> {
        let mut state = self.inner.lock().await;
        let balance = state
            .balances
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;
        *balance += delta;
        debug!(account_id, %delta, new_balance = %balance, "Adjusted balance");
        Ok(*balance)
    }

    async fn list_loans(&self) -> Result<Vec<Loan>> {
        Ok(self.inner.lock().await.loans.values().cloned().collect())
    }

    async fn get_loan(&self, loan_id: &str) -> Result<Loan> {
        self.inner
            .lock()
            .await
            .loans
            .get(loan_id)
            .cloned()
            .ok_or_else(|| LedgerError::loan_not_found(loan_id))
    }

    async fn save_loan(&self, loan: &Loan) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.loans.insert(loan.id.clone(), loan.clone());
        Ok(())
    }

    async fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        self.inner.lock().await.transactions.push(tx.clone());
        Ok(())
    }

    async fn list_recent_transactions(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let state = self.inner.lock().await;
        let mut recent: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.timestamp >= since && tx.involves(account_id))
            .cloned()
            .collect();
        recent.sort_by_key(|tx| tx.timestamp);
        Ok(recent)
    }

    async fn list_loans_for_account(&self, account_id: &str) -> Result<Vec<Loan>> {
        let state = self.inner.lock().await;
        Ok(state
            .loans
            .values()
            .filter(|loan| loan.account_id == account_id)
            .cloned()
            .collect())
    }
}
