//! Periodic settlement of overdue loan installments.
//!
//! Each cycle walks every outstanding loan. An overdue installment is either
//! debited from the funding account or, when funds are short, answered with a
//! penalty installment appended to the schedule. The original installment then
//! stays unpaid and is evaluated again on the next cycle.
use crate::amortization::round_currency;
use crate::core::clock::Clock;
use crate::core::config::SettlementConfig;
use crate::core::error::{LedgerError, Result};
use crate::core::model::{Installment, Loan, Transaction};
use crate::core::store::LedgerStore;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SettlementPolicy {
    pub penalty_rate_percent: Decimal,
    pub penalty_grace_days: i64,
    pub period: std::time::Duration,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            penalty_rate_percent: dec!(10),
            penalty_grace_days: 7,
            period: std::time::Duration::from_secs(12 * 60 * 60),
        }
    }
}

impl From<&SettlementConfig> for SettlementPolicy {
    fn from(config: &SettlementConfig) -> Self {
        Self {
            penalty_rate_percent: config.penalty_rate_percent,
            penalty_grace_days: config.penalty_grace_days,
            period: config.interval(),
        }
    }
}

impl SettlementPolicy {
    pub fn penalty_for(&self, amount: Decimal) -> Decimal {
        round_currency(amount * self.penalty_rate_percent / dec!(100))
    }
}

/// What happened to one overdue installment during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallmentOutcome {
    Settled {
        loan_id: String,
        index: usize,
        amount: Decimal,
        transaction_recorded: bool,
    },
    Penalized {
        loan_id: String,
        index: usize,
        penalty: Decimal,
    },
    AccountMissing {
        loan_id: String,
        index: usize,
        account_id: String,
    },
    DebitFailed {
        loan_id: String,
        index: usize,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub loans_scanned: usize,
    pub loans_saved: usize,
    pub outcomes: Vec<InstallmentOutcome>,
    /// Loans whose changes could not be written back, with the reason.
    pub save_failures: Vec<(String, String)>,
    /// Set when the loan list itself could not be read.
    pub load_error: Option<String>,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            loans_scanned: 0,
            loans_saved: 0,
            outcomes: Vec::new(),
            save_failures: Vec::new(),
            load_error: None,
        }
    }

    pub fn settled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, InstallmentOutcome::Settled { .. }))
            .count()
    }

    pub fn penalized_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, InstallmentOutcome::Penalized { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.settled_count() - self.penalized_count()
    }

    pub fn collected(&self) -> Decimal {
        self.outcomes
            .iter()
            .map(|o| match o {
                InstallmentOutcome::Settled { amount, .. } => *amount,
                _ => Decimal::ZERO,
            })
            .sum()
    }
}

/// Clears the running flag when a cycle ends, including by panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the "cycle in progress" state. Construct once and share behind an `Arc`.
pub struct SettlementScheduler {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    policy: SettlementPolicy,
    running: AtomicBool,
}

impl SettlementScheduler {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        policy: SettlementPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            running: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one settlement pass. Returns `None` without doing anything when a
    /// cycle is already in progress.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Settlement cycle already running, skipping");
            return None;
        }
        let _guard = RunningGuard(&self.running);

        let now = self.clock.now();
        info!(%now, "Processing overdue loan payments");
        let mut report = CycleReport::new(now);

        let loans = match self.store.list_loans().await {
            Ok(loans) => loans,
            Err(e) => {
                error!(error = %e, "Failed to load loans, cycle skipped");
                report.load_error = Some(e.to_string());
                return Some(report);
            }
        };

        for mut loan in loans {
            if loan.is_repaid() {
                continue;
            }
            report.loans_scanned += 1;

            if self.settle_loan(&mut loan, now, &mut report.outcomes).await {
                match self.store.save_loan(&loan).await {
                    Ok(()) => report.loans_saved += 1,
                    Err(e) => {
                        error!(loan_id = %loan.id, error = %e, "Failed to save loan");
                        report.save_failures.push((loan.id.clone(), e.to_string()));
                    }
                }
            }
        }

        info!(
            loans = report.loans_scanned,
            settled = report.settled_count(),
            penalized = report.penalized_count(),
            skipped = report.skipped_count(),
            save_failures = report.save_failures.len(),
            "Finished processing overdue loan payments"
        );
        Some(report)
    }

    /// Settles or penalizes each overdue installment of `loan` in schedule
    /// order. Returns whether the loan changed.
    async fn settle_loan(
        &self,
        loan: &mut Loan,
        now: DateTime<Utc>,
        outcomes: &mut Vec<InstallmentOutcome>,
    ) -> bool {
        let mut modified = false;
        // Penalties appended during this pass are not revisited until the next cycle
        let scheduled = loan.schedule.len();

        for index in 0..scheduled {
            let installment = loan.schedule[index].clone();
            if !installment.is_overdue(now) {
                continue;
            }

            let balance = match self.store.get_account_balance(&loan.account_id).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!(loan_id = %loan.id, account_id = %loan.account_id, error = %e, "Funding account unavailable");
                    outcomes.push(InstallmentOutcome::AccountMissing {
                        loan_id: loan.id.clone(),
                        index,
                        account_id: loan.account_id.clone(),
                    });
                    continue;
                }
            };

            if balance >= installment.amount {
                if let Err(e) = self
                    .store
                    .adjust_account_balance(&loan.account_id, -installment.amount)
                    .await
                {
                    warn!(loan_id = %loan.id, account_id = %loan.account_id, error = %e, "Failed to debit loan payment");
                    outcomes.push(InstallmentOutcome::DebitFailed {
                        loan_id: loan.id.clone(),
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }

                loan.schedule[index].paid = true;
                loan.remaining_principal -= installment.principal_part;
                modified = true;

                let tx = Transaction::loan_payment(loan, installment.amount, now);
                let transaction_recorded = match self.store.append_transaction(&tx).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(loan_id = %loan.id, error = %e, "Failed to record loan payment transaction");
                        false
                    }
                };

                info!(loan_id = %loan.id, amount = %installment.amount, "Processed loan payment");
                outcomes.push(InstallmentOutcome::Settled {
                    loan_id: loan.id.clone(),
                    index,
                    amount: installment.amount,
                    transaction_recorded,
                });
            } else {
                let penalty = self.policy.penalty_for(installment.amount);
                let due_date = now + Duration::days(self.policy.penalty_grace_days);
                loan.schedule.push(Installment::penalty(due_date, penalty));
                modified = true;

                info!(loan_id = %loan.id, %penalty, %balance, due = %installment.amount, "Applied late payment penalty");
                outcomes.push(InstallmentOutcome::Penalized {
                    loan_id: loan.id.clone(),
                    index,
                    penalty,
                });
            }
        }

        modified
    }

    /// Runs a cycle immediately, then once per period, until `shutdown` resolves.
    ///
    /// Ticks follow a fixed wall-clock grid. A tick that arrives while a cycle
    /// is still running is dropped rather than queued. Cycles already started
    /// when `shutdown` fires run to completion before this returns.
    pub async fn run_until<F>(self: Arc<Self>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.policy.period.is_zero() {
            return Err(LedgerError::InvalidArgument(
                "settlement period must be non-zero".to_string(),
            ));
        }
        info!(period = ?self.policy.period, "Starting payment scheduler");

        let mut ticker = tokio::time::interval(self.policy.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    while cycles.try_join_next().is_some() {}
                    let cycle = Arc::clone(&self);
                    cycles.spawn(async move {
                        cycle.run_cycle().await;
                    });
                }
            }
        }

        if !cycles.is_empty() {
            info!("Waiting for the running settlement cycle to finish");
        }
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Settlement cycle task failed");
            }
        }
        info!("Payment scheduler stopped");
        Ok(())
    }
}
