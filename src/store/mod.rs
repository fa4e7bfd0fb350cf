pub mod disk;
pub mod memory;

use crate::core::config::{AppConfig, OpeningAccount};
use crate::core::store::LedgerStore;
use anyhow::{Context, Result};
pub use disk::DiskLedger;
pub use memory::MemoryLedger;
use std::sync::Arc;
use tracing::info;

/// Opens the durable ledger under the configured data directory.
pub fn open_ledger(config: &AppConfig) -> Result<Arc<DiskLedger>> {
    let path = config.default_data_path()?.join("ledger");
    let ledger = DiskLedger::open(&path)
        .with_context(|| format!("Failed to open ledger at {}", path.display()))?;
    Ok(Arc::new(ledger))
}

/// Creates configured accounts that do not exist yet. Existing balances are left alone.
pub async fn seed_accounts(store: &dyn LedgerStore, accounts: &[OpeningAccount]) -> Result<usize> {
    let mut created = 0;
    for account in accounts {
        if store
            .open_account(&account.id, account.opening_balance)
            .await
            .with_context(|| format!("Failed to open account {}", account.id))?
        {
            info!(account_id = %account.id, balance = %account.opening_balance, "Seeded account");
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_seed_accounts_is_idempotent() {
        let store = MemoryLedger::new();
        let accounts = vec![
            OpeningAccount {
                id: "acc-1".to_string(),
                opening_balance: dec!(100),
            },
            OpeningAccount {
                id: "acc-2".to_string(),
                opening_balance: dec!(0),
            },
        ];

        assert_eq!(seed_accounts(&store, &accounts).await.unwrap(), 2);
        store.adjust_account_balance("acc-1", dec!(-50)).await.unwrap();
        assert_eq!(seed_accounts(&store, &accounts).await.unwrap(), 0);
        assert_eq!(store.get_account_balance("acc-1").await.unwrap(), dec!(50));
    }

    #[tokio::test]
    async fn test_open_ledger_uses_data_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_path: Some(dir.path().to_string_lossy().into_owned()),
            ..AppConfig::default()
        };
        let ledger = open_ledger(&config).unwrap();
        ledger.open_account("acc-1", dec!(1)).await.unwrap();
        assert!(dir.path().join("ledger").exists());
    }
}
