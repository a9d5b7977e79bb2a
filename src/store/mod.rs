//! Storage Session
//!
//! A session is one database transaction: every ledger operation opens
//! exactly one, runs its statements through it, and either commits it or
//! releases it (rolling back).
//!
//! The engine only depends on the [`SessionFactory`] / [`LedgerSession`]
//! traits; [`PgSessionFactory`] is the production backend and
//! [`MemoryStore`] an in-process one for tests and dry runs.

use async_trait::async_trait;

use crate::domain::{Account, AccountNumber, DbError, TransferId, TransferRecord};

pub mod memory;
pub mod pg;

pub use memory::{MemoryStore, Statement};
pub use pg::PgSessionFactory;

/// Unit of work over the ledger tables.
///
/// Implementations run every call inside a single read-committed
/// transaction. Dropping a session without committing rolls it back.
#[async_trait]
pub trait LedgerSession: Send {
    /// Read both accounts with a row-level exclusive lock, in one statement.
    ///
    /// Rows that do not exist are simply absent from the result.
    async fn lock_accounts(
        &mut self,
        first: AccountNumber,
        second: AccountNumber,
    ) -> Result<Vec<Account>, DbError>;

    /// Number of accounts with the given number (0 or 1)
    async fn count_accounts(&mut self, number: AccountNumber) -> Result<i64, DbError>;

    /// All accounts ordered by unsigned account number
    async fn list_accounts(&mut self) -> Result<Vec<Account>, DbError>;

    /// Number of transfer rows with the given id
    async fn count_transfers(&mut self, id: TransferId) -> Result<i64, DbError>;

    /// Transfers where the account is source or dest, newest first
    async fn transfers_for_account(
        &mut self,
        number: AccountNumber,
    ) -> Result<Vec<TransferRecord>, DbError>;

    /// `balance = balance + delta` for one account; returns rows affected
    async fn adjust_balance(&mut self, number: AccountNumber, delta: i64) -> Result<u64, DbError>;

    /// Append one transfer row; returns rows affected
    async fn insert_transfer(
        &mut self,
        id: TransferId,
        source: AccountNumber,
        dest: AccountNumber,
        amount: i64,
    ) -> Result<u64, DbError>;

    /// Commit the transaction. The session is closed afterwards.
    async fn commit(&mut self) -> Result<(), DbError>;

    /// Roll back if not yet committed; a no-op on a closed session.
    async fn release(&mut self) -> Result<(), DbError>;
}

/// Opens sessions; injected into the ledger services at construction.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, DbError>;
}
