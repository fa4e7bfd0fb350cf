//! Core ledger abstractions

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod model;
pub mod rate;
pub mod store;

// Re-export main types for cleaner imports
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LedgerError, Result};
pub use model::{
    Account, BalanceForecast, ForecastPoint, Installment, Loan, Transaction, TransactionKind,
};
pub use rate::{FixedKeyRate, KeyRateProvider};
pub use store::LedgerStore;
