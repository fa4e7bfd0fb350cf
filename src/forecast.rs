//! Forward projection of an account balance from recent cash flow and loan schedules.
use crate::core::clock::Clock;
use crate::core::error::{LedgerError, Result};
use crate::core::model::{BalanceForecast, ForecastPoint, Loan, Transaction};
use crate::core::store::LedgerStore;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_HORIZON_DAYS: i64 = 30;
pub const MAX_HORIZON_DAYS: i64 = 365;
/// Trailing window, and the fixed divisor, for average daily flows.
pub const LOOKBACK_DAYS: i64 = 30;

pub fn validate_horizon(horizon_days: i64) -> Result<()> {
    if horizon_days <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "horizon must be a positive number of days, got {horizon_days}"
        )));
    }
    if horizon_days > MAX_HORIZON_DAYS {
        return Err(LedgerError::InvalidArgument(format!(
            "maximum forecast horizon is {MAX_HORIZON_DAYS} days, got {horizon_days}"
        )));
    }
    Ok(())
}

/// Average daily inflow and outflow for `account_id`.
///
/// Sums are divided by [`LOOKBACK_DAYS`] no matter how many transactions
/// qualify or how old the account is.
pub fn average_daily_flows(account_id: &str, transactions: &[Transaction]) -> (Decimal, Decimal) {
    let mut inflow = Decimal::ZERO;
    let mut outflow = Decimal::ZERO;
    for tx in transactions {
        if tx.from_account_id.as_deref() == Some(account_id) {
            outflow += tx.amount;
        }
        if tx.to_account_id.as_deref() == Some(account_id) {
            inflow += tx.amount;
        }
    }
    let days = Decimal::from(LOOKBACK_DAYS);
    (inflow / days, outflow / days)
}

/// Amount due on `date`'s calendar day: at most the first matching unpaid installment of each loan.
fn due_on(loans: &[Loan], date: DateTime<Utc>) -> Decimal {
    let day = date.date_naive();
    loans
        .iter()
        .filter_map(|loan| {
            loan.schedule
                .iter()
                .find(|i| !i.paid && i.due_date.date_naive() == day)
                .map(|i| i.amount)
        })
        .sum()
}

/// Simulates `horizon_days` daily balances starting the day after `now`.
///
/// `transactions` must already be restricted to the lookback window.
pub fn simulate(
    account_id: &str,
    current_balance: Decimal,
    transactions: &[Transaction],
    loans: &[Loan],
    now: DateTime<Utc>,
    horizon_days: i64,
) -> BalanceForecast {
    let (avg_daily_inflow, avg_daily_outflow) = average_daily_flows(account_id, transactions);

    let mut balance = current_balance;
    let points = (1..=horizon_days)
        .map(|day| {
            let date = now + Duration::days(day);
            balance += avg_daily_inflow - avg_daily_outflow;
            balance -= due_on(loans, date);
            ForecastPoint { date, balance }
        })
        .collect();

    BalanceForecast {
        account_id: account_id.to_string(),
        current_balance,
        horizon_days,
        avg_daily_inflow,
        avg_daily_outflow,
        points,
    }
}

/// Read-only balance forecasting over the ledger.
pub struct BalanceProjector {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl BalanceProjector {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Projects daily balances for the account. `horizon_days` defaults to
    /// [`DEFAULT_HORIZON_DAYS`] and must lie in `1..=365`.
    pub async fn project_balance(
        &self,
        account_id: &str,
        horizon_days: Option<i64>,
    ) -> Result<BalanceForecast> {
        let horizon_days = horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
        validate_horizon(horizon_days)?;

        let current_balance = self.store.get_account_balance(account_id).await?;
        let now = self.clock.now();
        let transactions = self
            .store
            .list_recent_transactions(account_id, now - Duration::days(LOOKBACK_DAYS))
            .await?;
        let loans = self.store.list_loans_for_account(account_id).await?;

        let forecast = simulate(
            account_id,
            current_balance,
            &transactions,
            &loans,
            now,
            horizon_days,
        );
        info!(
            account_id,
            horizon_days,
            inflow = %forecast.avg_daily_inflow,
            outflow = %forecast.avg_daily_outflow,
            "Generated balance forecast"
        );
        Ok(forecast)
    }
}
