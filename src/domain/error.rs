//! Ledger Error Types
//!
//! Storage failures and transfer outcomes, independent of the web layer.

use std::time::Duration;

use thiserror::Error;

use super::AccountNumber;

/// Failure reported by a storage session
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The transaction outlived its deadline and was abandoned
    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),

    /// A query that must yield a row yielded none
    #[error("No data returned from query: {0}")]
    NoRows(&'static str),

    /// The session was already committed or released
    #[error("Session is closed")]
    SessionClosed,

    /// Failure raised by an in-process store
    #[error("Storage failure: {0}")]
    Store(String),
}

/// Fieldless discriminant of [`TransferError`], for comparison by tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Database,
    InvalidAccount,
    NotEnoughMoney,
    AlreadyComplete,
    InvalidAmount,
    SameAccount,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database_error",
            ErrorKind::InvalidAccount => "invalid_account",
            ErrorKind::NotEnoughMoney => "not_enough_money",
            ErrorKind::AlreadyComplete => "transfer_already_complete",
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::SameAccount => "same_account",
        }
    }
}

/// Outcome of a rejected or failed ledger operation
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Account with number [{0}] not found")]
    InvalidAccount(AccountNumber),

    #[error("Source account does not have enough money")]
    NotEnoughMoney,

    #[error("Transfer already complete")]
    AlreadyComplete,

    #[error("Invalid transfer amount: {0}")]
    InvalidAmount(u64),

    #[error("Cannot transfer from account [{0}] to itself")]
    SameAccount(AccountNumber),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Database(_) => ErrorKind::Database,
            TransferError::InvalidAccount(_) => ErrorKind::InvalidAccount,
            TransferError::NotEnoughMoney => ErrorKind::NotEnoughMoney,
            TransferError::AlreadyComplete => ErrorKind::AlreadyComplete,
            TransferError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            TransferError::SameAccount(_) => ErrorKind::SameAccount,
        }
    }

    /// Check if this is a client error (malformed or already satisfied request)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TransferError::Database(_))
    }
}

impl From<sqlx::Error> for TransferError {
    fn from(e: sqlx::Error) -> Self {
        TransferError::Database(DbError::Sqlx(e))
    }
}
