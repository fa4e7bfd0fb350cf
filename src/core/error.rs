//! Typed failures surfaced by the ledger operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected input such as a non-positive term or an out-of-range horizon.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A read or write against the storage collaborator failed.
    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn account_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: "Account",
            id: id.to_string(),
        }
    }

    pub fn loan_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: "Loan",
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }
}

impl From<fjall::Error> for LedgerError {
    fn from(e: fjall::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Storage(format!("corrupt record: {e}"))
    }
}
