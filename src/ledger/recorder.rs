//! Transfer Recorder

use crate::domain::{AccountNumber, TransferError, TransferId};
use crate::store::LedgerSession;

/// Append the immutable transfer row.
///
/// Anything other than one inserted row is reported as `AlreadyComplete`;
/// the unique key on `transfer_id` is the final backstop against a racing
/// duplicate.
pub async fn record(
    session: &mut dyn LedgerSession,
    id: TransferId,
    source: AccountNumber,
    dest: AccountNumber,
    amount: i64,
) -> Result<(), TransferError> {
    let rows = session.insert_transfer(id, source, dest, amount).await?;

    if rows != 1 {
        tracing::warn!(transfer_id = %id, rows, "Transfer row was not inserted");
        return Err(TransferError::AlreadyComplete);
    }

    Ok(())
}
