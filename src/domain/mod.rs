//! Domain module
//!
//! Core ledger types and error taxonomy.

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{Account, AccountNumber};
pub use error::{DbError, ErrorKind, TransferError};
pub use transfer::{Direction, TransferCommand, TransferEntry, TransferId, TransferRecord};
