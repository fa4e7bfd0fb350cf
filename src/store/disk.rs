use crate::core::error::{LedgerError, Result};
use crate::core::model::{Account, Loan, Transaction};
use crate::core::store::LedgerStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Durable ledger backed by a fjall keyspace with one partition per entity.
pub struct DiskLedger {
    keyspace: Keyspace,
    accounts: PartitionHandle,
    loans: PartitionHandle,
    transactions: PartitionHandle,
    account_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

fn encode<V: Serialize>(value: &V) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Orders transaction keys by timestamp so time-bounded scans are range reads.
fn transaction_key_prefix(timestamp: DateTime<Utc>) -> String {
    format!("{:020}", timestamp.timestamp_micros().max(0))
}

fn transaction_key(tx: &Transaction) -> String {
    format!("{}:{}", transaction_key_prefix(tx.timestamp), tx.id)
}

impl DiskLedger {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| LedgerError::Storage(format!("{}: {e}", path.display())))?;
        let keyspace = fjall::Config::new(path).open()?;
        let accounts = keyspace.open_partition("accounts", PartitionCreateOptions::default())?;
        let loans = keyspace.open_partition("loans", PartitionCreateOptions::default())?;
        let transactions =
            keyspace.open_partition("transactions", PartitionCreateOptions::default())?;
        debug!("Opened ledger at {}", path.display());

        Ok(Self {
            keyspace,
            accounts,
            loans,
            transactions,
            account_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Flushes the journal to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    async fn account_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.account_locks.lock().await;
        Arc::clone(
            locks
                .entry(account_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn read_account(&self, account_id: &str) -> Result<Account> {
        match self.accounts.get(account_id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LedgerError::account_not_found(account_id)),
        }
    }

    fn scan_loans(&self, filter: impl Fn(&Loan) -> bool) -> Result<Vec<Loan>> {
        let mut loans = Vec::new();
        for entry in self.loans.iter() {
            let (_, value) = entry?;
            let loan: Loan = decode(&value)?;
            if filter(&loan) {
                loans.push(loan);
            }
        }
        Ok(loans)
    }
}

#[async_trait]
impl LedgerStore for DiskLedger {
    async fn get_account_balance(&self, account_id: &str) -> Result<Decimal> {
        Ok(self.read_account(account_id)?.balance)
    }

    async fn open_account(&self, account_id: &str, opening_balance: Decimal) -> Result<bool> {
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;
        if self.accounts.get(account_id)?.is_some() {
            return Ok(false);
        }
        let account = Account {
            id: account_id.to_string(),
            balance: opening_balance,
        };
        self.accounts.insert(account_id, encode(&account)?)?;
        debug!(account_id, %opening_balance, "Opened account");
        Ok(true)
    }

    async fn adjust_account_balance(&self, account_id: &str, delta: Decimal) -> Result<Decimal> {
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        let mut account = self.read_account(account_id)?;
        account.balance += delta;
        self.accounts.insert(account_id, encode(&account)?)?;
        debug!(account_id, %delta, new_balance = %account.balance, "Adjusted balance");
        Ok(account.balance)
    }

    async fn list_loans(&self) -> Result<Vec<Loan>> {
        self.scan_loans(|_| true)
    }

    async fn get_loan(&self, loan_id: &str) -> Result<Loan> {
        match self.loans.get(loan_id)? {
            Some(bytes) => decode(&bytes),
            None => Err(LedgerError::loan_not_found(loan_id)),
        }
    }

    async fn save_loan(&self, loan: &Loan) -> Result<()> {
        self.loans.insert(loan.id.as_str(), encode(loan)?)?;
        Ok(())
    }

    async fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        self.transactions.insert(transaction_key(tx), encode(tx)?)?;
        Ok(())
    }

    async fn list_recent_transactions(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let mut recent = Vec::new();
        for entry in self.transactions.range(transaction_key_prefix(since)..) {
            let (_, value) = entry?;
            let tx: Transaction = decode(&value)?;
            if tx.timestamp >= since && tx.involves(account_id) {
                recent.push(tx);
            }
        }
        Ok(recent)
    }

    async fn list_loans_for_account(&self, account_id: &str) -> Result<Vec<Loan>> {
        self.scan_loans(|loan| loan.account_id == account_id)
    }
}
