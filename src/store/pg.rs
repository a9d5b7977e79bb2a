//! PostgreSQL session
//!
//! Each session owns a pooled connection with an open read-committed
//! transaction and a deadline. Every statement, and the commit, must finish
//! before the deadline or the session fails with [`DbError::Timeout`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::{Account, AccountNumber, DbError, TransferId, TransferRecord};

use super::{LedgerSession, SessionFactory};

/// Bound on the rollback issued by `release`, independent of the session
/// deadline (which may already have passed)
pub const ROLLBACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Session factory backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgSessionFactory {
    pool: PgPool,
    timeout: Duration,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn begin(&self) -> Result<Box<dyn LedgerSession>, DbError> {
        let session = PgSession::begin(&self.pool, self.timeout).await?;
        Ok(Box::new(session))
    }
}

/// One transaction on one pooled connection
pub struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
    deadline: Instant,
    timeout: Duration,
}

impl PgSession {
    async fn begin(pool: &PgPool, timeout: Duration) -> Result<Self, DbError> {
        let deadline = Instant::now() + timeout;
        let mut tx = bounded(deadline, timeout, pool.begin()).await?;

        bounded(
            deadline,
            timeout,
            sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED").execute(&mut *tx),
        )
        .await?;

        // Server-side guard for statements that outlive the client deadline
        let statement_timeout = format!("SET LOCAL statement_timeout = {}", timeout.as_millis());
        bounded(
            deadline,
            timeout,
            sqlx::query(&statement_timeout).execute(&mut *tx),
        )
        .await?;

        Ok(Self {
            tx: Some(tx),
            deadline,
            timeout,
        })
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, DbError> {
        self.tx.as_mut().ok_or(DbError::SessionClosed)
    }
}

/// Accounts from `(account_number, balance)` rows, in unsigned number order.
///
/// Numbers above `i64::MAX` are stored negative, so `ORDER BY` on the column
/// would put them first.
fn accounts_from_rows(rows: Vec<(i64, i64)>) -> Vec<Account> {
    let mut accounts: Vec<Account> = rows
        .into_iter()
        .map(|(number, balance)| Account {
            number: AccountNumber::from_db(number),
            balance,
        })
        .collect();
    accounts.sort_by_key(|account| account.number);
    accounts
}

/// Run `fut` under its own short deadline
async fn rollback_within<F>(fut: F) -> Result<(), DbError>
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    bounded(Instant::now() + ROLLBACK_TIMEOUT, ROLLBACK_TIMEOUT, fut).await
}

/// Run a driver call, failing with `Timeout` once `deadline` has passed
async fn bounded<T, F>(deadline: Instant, timeout: Duration, fut: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result.map_err(DbError::from),
        Err(_) => Err(DbError::Timeout(timeout)),
    }
}

#[async_trait]
impl LedgerSession for PgSession {
    async fn lock_accounts(
        &mut self,
        first: AccountNumber,
        second: AccountNumber,
    ) -> Result<Vec<Account>, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let rows: Vec<(i64, i64)> = bounded(
            deadline,
            timeout,
            sqlx::query_as(
                r#"
                SELECT account_number, balance FROM public.accounts
                WHERE account_number = $1 OR account_number = $2
                FOR UPDATE
                "#,
            )
            .bind(first.to_db())
            .bind(second.to_db())
            .fetch_all(&mut **tx),
        )
        .await?;

        Ok(accounts_from_rows(rows))
    }

    async fn count_accounts(&mut self, number: AccountNumber) -> Result<i64, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let count: Option<i64> = bounded(
            deadline,
            timeout,
            sqlx::query_scalar("SELECT COUNT(*) FROM public.accounts WHERE account_number = $1")
                .bind(number.to_db())
                .fetch_optional(&mut **tx),
        )
        .await?;

        count.ok_or(DbError::NoRows("count accounts"))
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let rows: Vec<(i64, i64)> = bounded(
            deadline,
            timeout,
            sqlx::query_as("SELECT account_number, balance FROM public.accounts")
                .fetch_all(&mut **tx),
        )
        .await?;

        Ok(accounts_from_rows(rows))
    }

    async fn count_transfers(&mut self, id: TransferId) -> Result<i64, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let count: Option<i64> = bounded(
            deadline,
            timeout,
            sqlx::query_scalar("SELECT COUNT(*) FROM public.transfers WHERE transfer_id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut **tx),
        )
        .await?;

        count.ok_or(DbError::NoRows("count transfers"))
    }

    async fn transfers_for_account(
        &mut self,
        number: AccountNumber,
    ) -> Result<Vec<TransferRecord>, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let rows: Vec<(Uuid, i64, i64, i64, DateTime<Utc>)> = bounded(
            deadline,
            timeout,
            sqlx::query_as(
                r#"
                SELECT transfer_id, amount, source_account, dest_account, created_at
                FROM public.transfers
                WHERE source_account = $1 OR dest_account = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(number.to_db())
            .fetch_all(&mut **tx),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, amount, source, dest, created_at)| TransferRecord {
                id: TransferId(id),
                amount,
                source: AccountNumber::from_db(source),
                dest: AccountNumber::from_db(dest),
                created_at,
            })
            .collect())
    }

    async fn adjust_balance(&mut self, number: AccountNumber, delta: i64) -> Result<u64, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let result = bounded(
            deadline,
            timeout,
            sqlx::query("UPDATE public.accounts SET balance = balance + $1 WHERE account_number = $2")
                .bind(delta)
                .bind(number.to_db())
                .execute(&mut **tx),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_transfer(
        &mut self,
        id: TransferId,
        source: AccountNumber,
        dest: AccountNumber,
        amount: i64,
    ) -> Result<u64, DbError> {
        let (deadline, timeout) = (self.deadline, self.timeout);
        let tx = self.tx()?;

        let result = bounded(
            deadline,
            timeout,
            sqlx::query(
                r#"
                INSERT INTO public.transfers (transfer_id, amount, source_account, dest_account)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id.as_uuid())
            .bind(amount)
            .bind(source.to_db())
            .bind(dest.to_db())
            .execute(&mut **tx),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        let tx = self.tx.take().ok_or(DbError::SessionClosed)?;
        bounded(self.deadline, self.timeout, tx.commit()).await
    }

    async fn release(&mut self) -> Result<(), DbError> {
        match self.tx.take() {
            Some(tx) => rollback_within(tx.rollback()).await,
            None => Ok(()),
        }
    }
}
