//! Transfer types
//!
//! A transfer row is written once, when the engine commits a money
//! movement, and never changes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::AccountNumber;

/// Client-supplied transfer identifier; doubles as the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub Uuid);

impl TransferId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TransferId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request to move `amount` from `source` to `dest`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub id: TransferId,
    pub source: AccountNumber,
    pub dest: AccountNumber,
    pub amount: u64,
}

impl TransferCommand {
    pub fn new(
        id: TransferId,
        source: impl Into<AccountNumber>,
        dest: impl Into<AccountNumber>,
        amount: u64,
    ) -> Self {
        Self {
            id,
            source: source.into(),
            dest: dest.into(),
            amount,
        }
    }
}

/// Persisted transfer row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub id: TransferId,
    pub amount: i64,
    pub source: AccountNumber,
    pub dest: AccountNumber,
    pub created_at: DateTime<Utc>,
}

/// Direction of a transfer relative to the account it is listed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer as seen from one account's history.
///
/// Exactly one of `from_account` / `to_account` is set: the counter-party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEntry {
    pub id: TransferId,
    pub account: AccountNumber,
    /// Sender, for incoming transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_account: Option<AccountNumber>,
    /// Recipient, for outgoing transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account: Option<AccountNumber>,
    pub amount: i64,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

impl TransferEntry {
    /// Project a stored transfer onto `account`'s history.
    ///
    /// Returns `None` when the transfer does not involve `account`.
    pub fn for_account(record: TransferRecord, account: AccountNumber) -> Option<Self> {
        let (direction, from_account, to_account) = if record.source == account {
            (Direction::Outgoing, None, Some(record.dest))
        } else if record.dest == account {
            (Direction::Incoming, Some(record.source), None)
        } else {
            return None;
        };

        Some(Self {
            id: record.id,
            account,
            from_account,
            to_account,
            amount: record.amount,
            direction,
            created_at: record.created_at,
        })
    }
}
