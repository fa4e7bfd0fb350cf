use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use loanbook::core::log::init_logging;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for loanbook::AppCommand {
    fn from(cmd: Commands) -> loanbook::AppCommand {
        match cmd {
            Commands::Quote {
                principal,
                rate,
                term,
                start,
            } => loanbook::AppCommand::Quote {
                principal,
                annual_rate_percent: rate,
                term_months: term,
                start,
            },
            Commands::Apply {
                user,
                account,
                amount,
                term,
            } => loanbook::AppCommand::Apply {
                user_id: user,
                account_id: account,
                amount,
                term_months: term,
            },
            Commands::Schedule { loan_id } => loanbook::AppCommand::Schedule { loan_id },
            Commands::Settle => loanbook::AppCommand::Settle,
            Commands::Serve => loanbook::AppCommand::Serve,
            Commands::Forecast { account, days } => loanbook::AppCommand::Forecast {
                account_id: account,
                days,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Preview an amortization schedule
    Quote {
        /// Loan principal
        #[arg(short, long)]
        principal: Decimal,
        /// Annual interest rate in percent
        #[arg(short, long)]
        rate: Decimal,
        /// Term in months
        #[arg(short, long)]
        term: i32,
        /// First day of the loan (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        start: Option<NaiveDate>,
    },
    /// Approve a loan and disburse it to an account
    Apply {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        account: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(short, long)]
        term: i32,
    },
    /// Show a loan's repayment schedule
    Schedule {
        #[arg(short, long = "loan")]
        loan_id: String,
    },
    /// Run one settlement cycle over overdue installments
    Settle,
    /// Run settlement periodically until interrupted
    Serve,
    /// Project an account balance
    Forecast {
        #[arg(short, long)]
        account: String,
        /// Horizon in days (1-365)
        #[arg(short, long)]
        days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => loanbook::cli::setup::setup_at_path(path),
            None => loanbook::cli::setup::setup(),
        },
        Some(cmd) => loanbook::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
