//! Transfer Idempotency Guard

use crate::domain::{DbError, TransferId};
use crate::store::LedgerSession;

/// Whether a transfer with this id has already been recorded.
///
/// Must run after [`super::reader::read_pair`] in the same session: with both
/// account rows locked, a concurrent retry of the same id waits for this
/// transaction to end and then sees its transfer row.
pub async fn is_duplicate(session: &mut dyn LedgerSession, id: TransferId) -> Result<bool, DbError> {
    let count = session.count_transfers(id).await?;
    Ok(count > 0)
}
