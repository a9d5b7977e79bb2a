//! Transfer history read path
//!
//! Unlocked reads: a transfer committing concurrently may be missing from
//! one listing and present in the next.

use crate::domain::{AccountNumber, TransferEntry, TransferError};
use crate::store::LedgerSession;

/// Transfers of `account`, newest first, each tagged with its direction
/// and counter-party.
pub async fn list_for_account(
    session: &mut dyn LedgerSession,
    account: AccountNumber,
) -> Result<Vec<TransferEntry>, TransferError> {
    if session.count_accounts(account).await? == 0 {
        return Err(TransferError::InvalidAccount(account));
    }

    let records = session.transfers_for_account(account).await?;

    Ok(records
        .into_iter()
        .filter_map(|record| TransferEntry::for_account(record, account))
        .collect())
}
