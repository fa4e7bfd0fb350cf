pub mod amortization;
pub mod cli;
pub mod core;
pub mod forecast;
pub mod origination;
pub mod providers;
pub mod settlement;
pub mod store;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::store::LedgerStore;
use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Quote {
        principal: Decimal,
        annual_rate_percent: Decimal,
        term_months: i32,
        start: Option<NaiveDate>,
    },
    Apply {
        user_id: String,
        account_id: String,
        amount: Decimal,
        term_months: i32,
    },
    Schedule {
        loan_id: String,
    },
    Settle,
    Serve,
    Forecast {
        account_id: String,
        days: Option<i64>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Loanbook starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // Quotes are pure and never open the ledger
    if let AppCommand::Quote {
        principal,
        annual_rate_percent,
        term_months,
        start,
    } = command
    {
        let start_date = match start {
            Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
            None => Utc::now(),
        };
        cli::loan::quote(principal, annual_rate_percent, term_months, start_date)?;
        return Ok(());
    }

    let ledger = store::open_ledger(&config)?;
    store::seed_accounts(ledger.as_ref(), &config.accounts).await?;

    let store: Arc<dyn LedgerStore> = ledger.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let result = match command {
        AppCommand::Quote { .. } => Ok(()),
        AppCommand::Apply {
            user_id,
            account_id,
            amount,
            term_months,
        } => {
            let rates = providers::key_rate_provider(&config.rates);
            let originator =
                origination::LoanOriginator::new(store, rates, clock, &config.rates);
            let application = origination::LoanApplication {
                user_id,
                account_id,
                amount,
                term_months,
            };
            cli::loan::apply(&originator, &application).await.map(|_| ())
        }
        AppCommand::Schedule { loan_id } => {
            cli::loan::show_schedule(store.as_ref(), &loan_id, clock.now())
                .await
                .map(|_| ())
        }
        AppCommand::Settle => {
            let scheduler = settlement::SettlementScheduler::new(
                store,
                clock,
                settlement::SettlementPolicy::from(&config.settlement),
            );
            cli::settle::settle_once(&scheduler).await.map(|_| ())
        }
        AppCommand::Serve => {
            let scheduler = Arc::new(settlement::SettlementScheduler::new(
                store,
                clock,
                settlement::SettlementPolicy::from(&config.settlement),
            ));
            cli::settle::serve(scheduler).await
        }
        AppCommand::Forecast { account_id, days } => {
            let projector = forecast::BalanceProjector::new(store, clock);
            cli::forecast::run(&projector, &account_id, days)
                .await
                .map(|_| ())
        }
    };

    ledger.persist()?;
    result
}
