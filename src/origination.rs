//! Loan approval: pricing, schedule generation and disbursement.
use crate::amortization;
use crate::core::clock::Clock;
use crate::core::config::RatesConfig;
use crate::core::error::{LedgerError, Result};
use crate::core::model::{Loan, Transaction};
use crate::core::rate::KeyRateProvider;
use crate::core::store::LedgerStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub user_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub term_months: i32,
}

pub struct LoanOriginator {
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn KeyRateProvider>,
    clock: Arc<dyn Clock>,
    markup_percent: Decimal,
    default_key_rate: Decimal,
}

impl LoanOriginator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        rates: Arc<dyn KeyRateProvider>,
        clock: Arc<dyn Clock>,
        config: &RatesConfig,
    ) -> Self {
        Self {
            store,
            rates,
            clock,
            markup_percent: config.markup_percent,
            default_key_rate: config.default_key_rate,
        }
    }

    /// Annual rate offered to borrowers: key rate plus the bank's markup.
    pub async fn loan_rate(&self) -> Decimal {
        let key_rate = match self.rates.key_rate().await {
            Ok(rate) => rate,
            Err(e) => {
                warn!(error = %e, default = %self.default_key_rate, "Failed to get key rate, using default");
                self.default_key_rate
            }
        };
        key_rate + self.markup_percent
    }

    /// Approves the application, persists the loan and credits the principal.
    ///
    /// The disbursement transaction is recorded best effort; the loan stands
    /// even if that write fails.
    pub async fn originate(&self, application: &LoanApplication) -> Result<Loan> {
        if application.amount <= Decimal::ZERO || application.term_months <= 0 {
            return Err(LedgerError::InvalidArgument(
                "loan amount and term must be positive".to_string(),
            ));
        }
        self.store
            .get_account_balance(&application.account_id)
            .await?;

        let rate = self.loan_rate().await;
        let start_date = self.clock.now();
        let quote =
            amortization::generate(application.amount, rate, application.term_months, start_date)?;

        let loan = Loan {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: application.user_id.clone(),
            account_id: application.account_id.clone(),
            principal: application.amount,
            annual_rate_percent: rate,
            term_months: application.term_months,
            start_date,
            schedule: quote.schedule,
            remaining_principal: application.amount,
        };

        self.store.save_loan(&loan).await?;
        self.store
            .adjust_account_balance(&loan.account_id, loan.principal)
            .await?;

        let tx = Transaction::loan_disbursement(&loan, start_date);
        if let Err(e) = self.store.append_transaction(&tx).await {
            warn!(loan_id = %loan.id, error = %e, "Failed to record loan disbursement transaction");
        }

        info!(
            loan_id = %loan.id,
            user_id = %loan.user_id,
            amount = %loan.principal,
            %rate,
            term_months = loan.term_months,
            monthly_payment = %quote.monthly_payment,
            "Loan approved, funds disbursed to account {}",
            loan.account_id
        );
        Ok(loan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::model::TransactionKind;
    use crate::core::rate::FixedKeyRate;
    use crate::store::MemoryLedger;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct FailingRates;

    #[async_trait]
    impl KeyRateProvider for FailingRates {
        async fn key_rate(&self) -> anyhow::Result<Decimal> {
            Err(anyhow::anyhow!("rate service down"))
        }
    }

    fn application(amount: Decimal, term_months: i32) -> LoanApplication {
        LoanApplication {
            user_id: "user-1".to_string(),
            account_id: "acc-1".to_string(),
            amount,
            term_months,
        }
    }

    async fn originator(rates: Arc<dyn KeyRateProvider>) -> (Arc<MemoryLedger>, LoanOriginator) {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.open_account("acc-1", dec!(250)).await.unwrap();
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
        let originator = LoanOriginator::new(ledger.clone(), rates, clock, &RatesConfig::default());
        (ledger, originator)
    }

    #[tokio::test]
    async fn test_originate_prices_saves_and_disburses() {
        let (ledger, originator) = originator(Arc::new(FixedKeyRate(dec!(16)))).await;

        let loan = originator.originate(&application(dec!(12000), 12)).await.unwrap();

        assert_eq!(loan.annual_rate_percent, dec!(21));
        assert_eq!(loan.remaining_principal, dec!(12000));
        assert_eq!(loan.schedule.len(), 12);
        assert_eq!(ledger.get_loan(&loan.id).await.unwrap(), loan);
        assert_eq!(ledger.get_account_balance("acc-1").await.unwrap(), dec!(12250));

        let transactions = ledger.transactions().await;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].kind, TransactionKind::LoanDisbursement);
        assert_eq!(transactions[0].to_account_id.as_deref(), Some("acc-1"));
        assert_eq!(transactions[0].amount, dec!(12000));
    }

    #[tokio::test]
    async fn test_rate_failure_falls_back_to_default() {
        let (_, originator) = originator(Arc::new(FailingRates)).await;
        assert_eq!(originator.loan_rate().await, dec!(15));
    }

    #[tokio::test]
    async fn test_invalid_application_rejected() {
        let (ledger, originator) = originator(Arc::new(FixedKeyRate(dec!(16)))).await;

        for app in [application(Decimal::ZERO, 12), application(dec!(100), 0)] {
            let err = originator.originate(&app).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidArgument(_)));
        }
        assert!(ledger.list_loans().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account_rejected() {
        let (ledger, originator) = originator(Arc::new(FixedKeyRate(dec!(16)))).await;
        let app = LoanApplication {
            account_id: "ghost".to_string(),
            ..application(dec!(100), 6)
        };

        let err = originator.originate(&app).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(ledger.list_loans().await.unwrap().is_empty());
    }
}
