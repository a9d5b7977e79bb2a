//! Transfer Engine
//!
//! Runs one transfer as a single all-or-nothing unit of work:
//!
//! 1. open a session
//! 2. lock and load both accounts (source checked before dest)
//! 3. reject an already recorded transfer id
//! 4. reject an overdraft
//! 5. move the balances
//! 6. append the transfer row
//! 7. commit
//!
//! Any failure before the commit releases the session, rolling everything
//! back. The engine makes exactly one attempt per call; retrying with the
//! same transfer id is always safe because the id is the idempotency key.

use std::sync::Arc;

use crate::domain::{AccountNumber, TransferCommand, TransferEntry, TransferError};
use crate::store::{LedgerSession, SessionFactory};

use super::{guard, history, mutator, reader, recorder, release};

/// Executes transfers and serves transfer history
#[derive(Clone)]
pub struct TransferEngine {
    sessions: Arc<dyn SessionFactory>,
}

impl TransferEngine {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }

    /// Move `command.amount` from `command.source` to `command.dest`
    pub async fn transfer_money(&self, command: TransferCommand) -> Result<(), TransferError> {
        let amount = validate(&command)?;

        let mut session = self.sessions.begin().await?;

        let outcome = match execute(session.as_mut(), &command, amount).await {
            Ok(()) => session.commit().await.map_err(TransferError::from),
            Err(e) => Err(e),
        };

        // No-op after a successful commit
        release(session.as_mut()).await;

        match &outcome {
            Ok(()) => tracing::info!(
                transfer_id = %command.id,
                source = %command.source,
                dest = %command.dest,
                amount = command.amount,
                "Transfer committed"
            ),
            Err(e) if e.is_client_error() => tracing::warn!(
                transfer_id = %command.id,
                error_kind = e.kind().as_str(),
                "Transfer rejected: {}",
                e
            ),
            Err(e) => tracing::error!(
                transfer_id = %command.id,
                "Transfer failed: {}",
                e
            ),
        }

        outcome
    }

    /// Transfers involving `account`, newest first
    pub async fn list_transfers(
        &self,
        account: AccountNumber,
    ) -> Result<Vec<TransferEntry>, TransferError> {
        let mut session = self.sessions.begin().await?;
        let result = history::list_for_account(session.as_mut(), account).await;
        release(session.as_mut()).await;
        result
    }
}

/// Reject requests that can never succeed, before touching storage.
///
/// Returns the amount as the signed delta applied to balances.
fn validate(command: &TransferCommand) -> Result<i64, TransferError> {
    if command.amount == 0 {
        return Err(TransferError::InvalidAmount(command.amount));
    }

    let amount =
        i64::try_from(command.amount).map_err(|_| TransferError::InvalidAmount(command.amount))?;

    if command.source == command.dest {
        return Err(TransferError::SameAccount(command.source));
    }

    Ok(amount)
}

/// Steps 2 to 6, inside the caller's session
async fn execute(
    session: &mut dyn LedgerSession,
    command: &TransferCommand,
    amount: i64,
) -> Result<(), TransferError> {
    let accounts = reader::read_pair(session, command.source, command.dest).await?;

    let source = accounts
        .source
        .ok_or(TransferError::InvalidAccount(command.source))?;
    if accounts.dest.is_none() {
        return Err(TransferError::InvalidAccount(command.dest));
    }

    if guard::is_duplicate(session, command.id).await? {
        return Err(TransferError::AlreadyComplete);
    }

    if !source.can_cover(command.amount) {
        tracing::debug!(
            transfer_id = %command.id,
            balance = source.balance,
            amount = command.amount,
            "Insufficient balance"
        );
        return Err(TransferError::NotEnoughMoney);
    }

    mutator::apply_transfer(session, command.source, command.dest, amount).await?;
    recorder::record(session, command.id, command.source, command.dest, amount).await?;

    Ok(())
}
