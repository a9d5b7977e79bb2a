//! Balance Mutator
//!
//! Moves `amount` from one balance to another. Overdraft is not checked
//! here; the engine validates the source balance before calling in.

use crate::domain::{AccountNumber, TransferError};
use crate::store::LedgerSession;

/// Debit `source` and credit `dest` by `amount`.
///
/// Each update must touch exactly one row. Zero rows means the account
/// disappeared after it was locked, reported as `InvalidAccount` for that
/// side.
pub async fn apply_transfer(
    session: &mut dyn LedgerSession,
    source: AccountNumber,
    dest: AccountNumber,
    amount: i64,
) -> Result<(), TransferError> {
    let rows = session.adjust_balance(source, -amount).await?;
    if rows != 1 {
        tracing::error!(account = %source, rows, "Debit did not update the locked account");
        return Err(TransferError::InvalidAccount(source));
    }

    let rows = session.adjust_balance(dest, amount).await?;
    if rows != 1 {
        tracing::error!(account = %dest, rows, "Credit did not update the locked account");
        return Err(TransferError::InvalidAccount(dest));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::store::{MemoryStore, SessionFactory, Statement};

    #[tokio::test]
    async fn test_debits_then_credits() {
        let store = MemoryStore::with_accounts([(1, 1000), (2, 2000)]);
        let mut session = store.begin().await.unwrap();

        apply_transfer(session.as_mut(), AccountNumber(1), AccountNumber(2), 250)
            .await
            .unwrap();
        session.commit().await.unwrap();
        drop(session);

        assert_eq!(store.balance(1u64), Some(750));
        assert_eq!(store.balance(2u64), Some(2250));
        assert_eq!(
            store.journal()[1..3],
            [
                Statement::AdjustBalance(AccountNumber(1), -250),
                Statement::AdjustBalance(AccountNumber(2), 250),
            ]
        );
    }

    #[tokio::test]
    async fn test_does_not_clamp() {
        let store = MemoryStore::with_accounts([(1, 100), (2, 0)]);
        let mut session = store.begin().await.unwrap();

        apply_transfer(session.as_mut(), AccountNumber(1), AccountNumber(2), 150)
            .await
            .unwrap();
        session.commit().await.unwrap();
        drop(session);

        assert_eq!(store.balance(1u64), Some(-50));
    }

    #[tokio::test]
    async fn test_vanished_source() {
        let store = MemoryStore::with_accounts([(1, 1000), (2, 2000)]);
        store.vanish_on_update(1u64);
        let mut session = store.begin().await.unwrap();

        let err = apply_transfer(session.as_mut(), AccountNumber(1), AccountNumber(2), 10)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::InvalidAccount(AccountNumber(1))));
        // Credit is never attempted
        assert!(!store
            .journal()
            .contains(&Statement::AdjustBalance(AccountNumber(2), 10)));
    }

    #[tokio::test]
    async fn test_vanished_dest() {
        let store = MemoryStore::with_accounts([(1, 1000), (2, 2000)]);
        store.vanish_on_update(2u64);
        let mut session = store.begin().await.unwrap();

        let err = apply_transfer(session.as_mut(), AccountNumber(1), AccountNumber(2), 10)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidAccount);
        assert!(matches!(err, TransferError::InvalidAccount(AccountNumber(2))));
    }
}
