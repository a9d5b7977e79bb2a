//! Ledger Transfer Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod ledger;
pub mod store;

pub use config::Config;
pub use error::{AppError, ErrorResponse};
pub use domain::{Account, AccountNumber, TransferCommand, TransferEntry, TransferId};
pub use domain::{DbError, ErrorKind, TransferError};
pub use ledger::{AccountService, TransferEngine};
pub use store::{LedgerSession, MemoryStore, PgSessionFactory, SessionFactory};
