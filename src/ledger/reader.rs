//! Account Ledger Reader
//!
//! Loads the two accounts of a transfer under a row-level exclusive lock.

use crate::domain::{Account, AccountNumber, DbError};
use crate::store::LedgerSession;

/// Accounts locked for one transfer; `None` where the row does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPair {
    pub source: Option<Account>,
    pub dest: Option<Account>,
}

/// Lock and read the source and destination accounts.
///
/// Both rows are requested in a single `FOR UPDATE` statement, so two
/// transfers over the same pair (in either direction) queue on the database
/// lock manager instead of each holding one row and waiting on the other.
/// The locks are held until the session commits or is released.
pub async fn read_pair(
    session: &mut dyn LedgerSession,
    source: AccountNumber,
    dest: AccountNumber,
) -> Result<AccountPair, DbError> {
    let rows = session.lock_accounts(source, dest).await?;

    let mut pair = AccountPair {
        source: None,
        dest: None,
    };

    for account in rows {
        if account.number == source {
            pair.source = Some(account);
        }
        if account.number == dest {
            pair.dest = Some(account);
        }
    }

    tracing::debug!(
        source = %source,
        dest = %dest,
        source_found = pair.source.is_some(),
        dest_found = pair.dest.is_some(),
        "Accounts locked"
    );

    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SessionFactory, Statement};

    #[tokio::test]
    async fn test_reads_both_accounts_in_one_statement() {
        let store = MemoryStore::with_accounts([(1, 1000), (2, 2000)]);
        let mut session = store.begin().await.unwrap();

        let pair = read_pair(session.as_mut(), AccountNumber(1), AccountNumber(2))
            .await
            .unwrap();

        assert_eq!(pair.source, Some(Account::new(1, 1000)));
        assert_eq!(pair.dest, Some(Account::new(2, 2000)));

        let locks = store
            .journal()
            .into_iter()
            .filter(|s| matches!(s, Statement::LockAccounts(..)))
            .count();
        assert_eq!(locks, 1);
    }

    #[tokio::test]
    async fn test_missing_rows_are_none() {
        let store = MemoryStore::with_accounts([(2, 2000)]);
        let mut session = store.begin().await.unwrap();

        let pair = read_pair(session.as_mut(), AccountNumber(99), AccountNumber(2))
            .await
            .unwrap();
        assert!(pair.source.is_none());
        assert_eq!(pair.dest, Some(Account::new(2, 2000)));

        let pair = read_pair(session.as_mut(), AccountNumber(2), AccountNumber(98))
            .await
            .unwrap();
        assert_eq!(pair.source, Some(Account::new(2, 2000)));
        assert!(pair.dest.is_none());
    }
}
