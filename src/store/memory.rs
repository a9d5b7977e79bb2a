//! In-process ledger store
//!
//! Committed state lives behind a plain mutex that is only held for the
//! length of a read or a publish. Each account row also has its own async
//! lock: a session takes it in `lock_accounts` (or on first update) and
//! keeps it until commit or release, which mirrors `SELECT … FOR UPDATE`.
//! Sessions on disjoint accounts therefore run side by side, while a second
//! session on a locked row waits and then sees the committed balance.
//!
//! Writes are buffered in the session and published on commit, so rollback
//! is dropping the buffer. Faults can be armed to exercise the engine's
//! failure paths, and every statement is journaled so tests can assert the
//! protocol order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{Account, AccountNumber, DbError, TransferId, TransferRecord};

use super::{LedgerSession, SessionFactory};

/// Statement executed against the store, in journal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Begin,
    LockAccounts(AccountNumber, AccountNumber),
    CountAccounts(AccountNumber),
    ListAccounts,
    CountTransfers(TransferId),
    TransfersForAccount(AccountNumber),
    AdjustBalance(AccountNumber, i64),
    InsertTransfer(TransferId),
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
struct Tables {
    balances: BTreeMap<AccountNumber, i64>,
    row_locks: BTreeMap<AccountNumber, Arc<AsyncMutex<()>>>,
    transfers: Vec<TransferRecord>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_begin: bool,
    zero_rows_on_update: Option<AccountNumber>,
    zero_rows_on_insert: bool,
    fail_commit: bool,
}

/// Shared handle to an in-memory ledger
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Mutex<Faults>>,
    journal: Arc<Mutex<Vec<Statement>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-provisioned with `(number, balance)` accounts
    pub fn with_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (u64, i64)>,
    {
        let mut tables = Tables::default();
        for (number, balance) in accounts {
            let number = AccountNumber(number);
            tables.balances.insert(number, balance);
            tables.row_locks.insert(number, Arc::new(AsyncMutex::new(())));
        }

        Self {
            tables: Arc::new(Mutex::new(tables)),
            ..Self::default()
        }
    }

    /// Committed balance of an account
    pub fn balance(&self, number: impl Into<AccountNumber>) -> Option<i64> {
        lock(&self.tables).balances.get(&number.into()).copied()
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> i64 {
        lock(&self.tables).balances.values().sum()
    }

    /// Committed transfer rows, in insertion order
    pub fn transfers(&self) -> Vec<TransferRecord> {
        lock(&self.tables).transfers.clone()
    }

    /// Make the next `begin` fail as if the pool were exhausted
    pub fn fail_next_begin(&self) {
        lock(&self.faults).fail_begin = true;
    }

    /// Make balance updates on `number` affect zero rows
    pub fn vanish_on_update(&self, number: impl Into<AccountNumber>) {
        lock(&self.faults).zero_rows_on_update = Some(number.into());
    }

    /// Make transfer inserts affect zero rows
    pub fn skip_transfer_insert(&self) {
        lock(&self.faults).zero_rows_on_insert = true;
    }

    /// Make the next commit fail
    pub fn fail_next_commit(&self) {
        lock(&self.faults).fail_commit = true;
    }

    /// Clear all armed faults
    pub fn clear_faults(&self) {
        *lock(&self.faults) = Faults::default();
    }

    /// Statements executed so far
    pub fn journal(&self) -> Vec<Statement> {
        lock(&self.journal).clone()
    }

    fn record(&self, statement: Statement) {
        lock(&self.journal).push(statement);
    }

    fn row_lock(&self, number: AccountNumber) -> Option<Arc<AsyncMutex<()>>> {
        lock(&self.tables).row_locks.get(&number).cloned()
    }
}

#[async_trait]
impl SessionFactory for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, DbError> {
        let fail_begin = std::mem::take(&mut lock(&self.faults).fail_begin);
        if fail_begin {
            return Err(DbError::Store("connection pool exhausted".to_string()));
        }

        self.record(Statement::Begin);

        Ok(Box::new(MemorySession {
            store: self.clone(),
            open: true,
            held: BTreeMap::new(),
            balances: BTreeMap::new(),
            transfers: Vec::new(),
        }))
    }
}

/// Session over a [`MemoryStore`]
pub struct MemorySession {
    store: MemoryStore,
    open: bool,
    /// Row locks taken so far, released on commit or rollback
    held: BTreeMap<AccountNumber, OwnedMutexGuard<()>>,
    /// Balances of the locked rows as this session sees them
    balances: BTreeMap<AccountNumber, i64>,
    /// Transfer rows inserted by this session
    transfers: Vec<TransferRecord>,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), DbError> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::SessionClosed)
        }
    }

    /// Lock one row (waiting for any other holder) and return its balance.
    ///
    /// `None` when the account does not exist.
    async fn lock_row(&mut self, number: AccountNumber) -> Option<i64> {
        if let Some(balance) = self.balances.get(&number) {
            return Some(*balance);
        }

        let row = self.store.row_lock(number)?;
        let guard = row.lock_owned().await;

        // Read after acquiring so the last committed value is seen
        let balance = self.store.balance(number)?;
        self.held.insert(number, guard);
        self.balances.insert(number, balance);
        Some(balance)
    }

    fn discard(&mut self) {
        self.open = false;
        self.balances.clear();
        self.transfers.clear();
        self.held.clear();
    }

    fn is_recorded(&self, id: TransferId) -> bool {
        self.transfers.iter().any(|t| t.id == id)
            || lock(&self.store.tables).transfers.iter().any(|t| t.id == id)
    }
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn lock_accounts(
        &mut self,
        first: AccountNumber,
        second: AccountNumber,
    ) -> Result<Vec<Account>, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::LockAccounts(first, second));

        // Ascending order, so two sessions on the same pair cannot deadlock
        let mut numbers = vec![first, second];
        numbers.sort();
        numbers.dedup();

        let mut accounts = Vec::with_capacity(numbers.len());
        for number in numbers {
            if let Some(balance) = self.lock_row(number).await {
                accounts.push(Account { number, balance });
            }
        }

        Ok(accounts)
    }

    async fn count_accounts(&mut self, number: AccountNumber) -> Result<i64, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::CountAccounts(number));

        Ok(i64::from(self.store.balance(number).is_some()))
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::ListAccounts);

        let mut balances = lock(&self.store.tables).balances.clone();
        balances.extend(self.balances.iter().map(|(number, balance)| (*number, *balance)));

        Ok(balances
            .into_iter()
            .map(|(number, balance)| Account { number, balance })
            .collect())
    }

    async fn count_transfers(&mut self, id: TransferId) -> Result<i64, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::CountTransfers(id));

        Ok(i64::from(self.is_recorded(id)))
    }

    async fn transfers_for_account(
        &mut self,
        number: AccountNumber,
    ) -> Result<Vec<TransferRecord>, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::TransfersForAccount(number));

        let mut rows = lock(&self.store.tables).transfers.clone();
        rows.extend(self.transfers.iter().cloned());

        // Newest first; insertion order breaks timestamp ties
        Ok(rows
            .into_iter()
            .rev()
            .filter(|t| t.source == number || t.dest == number)
            .collect())
    }

    async fn adjust_balance(&mut self, number: AccountNumber, delta: i64) -> Result<u64, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::AdjustBalance(number, delta));

        let vanished = lock(&self.store.faults).zero_rows_on_update == Some(number);
        if vanished {
            return Ok(0);
        }

        // An UPDATE takes the row lock itself if the session does not hold it
        let Some(current) = self.lock_row(number).await else {
            return Ok(0);
        };

        let updated = current
            .checked_add(delta)
            .ok_or_else(|| DbError::Store("bigint out of range".to_string()))?;
        self.balances.insert(number, updated);
        Ok(1)
    }

    async fn insert_transfer(
        &mut self,
        id: TransferId,
        source: AccountNumber,
        dest: AccountNumber,
        amount: i64,
    ) -> Result<u64, DbError> {
        self.ensure_open()?;
        self.store.record(Statement::InsertTransfer(id));

        let skipped = lock(&self.store.faults).zero_rows_on_insert;
        if skipped {
            return Ok(0);
        }

        if self.is_recorded(id) {
            return Err(duplicate_key(id));
        }

        self.transfers.push(TransferRecord {
            id,
            amount,
            source,
            dest,
            created_at: Utc::now(),
        });

        Ok(1)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.ensure_open()?;

        let fail_commit = std::mem::take(&mut lock(&self.store.faults).fail_commit);
        if fail_commit {
            self.discard();
            self.store.record(Statement::Rollback);
            return Err(DbError::Store("could not serialize commit".to_string()));
        }

        let published = {
            let mut tables = lock(&self.store.tables);

            // A racing session on other rows may have recorded the same id
            match self
                .transfers
                .iter()
                .find(|pending| tables.transfers.iter().any(|t| t.id == pending.id))
            {
                Some(pending) => Err(duplicate_key(pending.id)),
                None => {
                    tables
                        .balances
                        .extend(self.balances.iter().map(|(number, balance)| (*number, *balance)));
                    tables.transfers.append(&mut self.transfers);
                    Ok(())
                }
            }
        };

        // Row locks are released only after the new balances are visible
        self.discard();
        match published {
            Ok(()) => self.store.record(Statement::Commit),
            Err(_) => self.store.record(Statement::Rollback),
        }
        published
    }

    async fn release(&mut self) -> Result<(), DbError> {
        if self.open {
            self.discard();
            self.store.record(Statement::Rollback);
        }
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if self.open {
            self.store.record(Statement::Rollback);
        }
    }
}

fn duplicate_key(id: TransferId) -> DbError {
    DbError::Store(format!(
        "duplicate key value violates unique constraint (transfer_id)=({})",
        id
    ))
}
