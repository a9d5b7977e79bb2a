//! Ledger module
//!
//! The transfer protocol and the read paths around it. Every public
//! operation runs in exactly one storage session.

pub mod accounts;
pub mod engine;
pub mod guard;
pub mod history;
pub mod mutator;
pub mod reader;
pub mod recorder;

pub use accounts::AccountService;
pub use engine::TransferEngine;
pub use reader::AccountPair;

use crate::store::LedgerSession;

/// Release a session, logging rather than propagating a failed rollback
/// so the operation's own outcome is what the caller sees.
async fn release(session: &mut dyn LedgerSession) {
    if let Err(e) = session.release().await {
        tracing::error!(error = %e, "Failed to release session");
    }
}
