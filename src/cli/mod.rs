//! Terminal front-end for the ledger operations.

pub mod forecast;
pub mod loan;
pub mod settle;
pub mod setup;
pub mod ui;
