//! Account types
//!
//! Accounts are provisioned outside this service; the ledger only reads
//! them and moves their balances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque unsigned account identifier.
///
/// Stored as `BIGINT`, so the value is bit-cast to `i64` on the way in and
/// back to `u64` on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(pub u64);

impl AccountNumber {
    /// Value as bound to a `BIGINT` column
    pub fn to_db(self) -> i64 {
        self.0 as i64
    }

    /// Value as read from a `BIGINT` column
    pub fn from_db(value: i64) -> Self {
        Self(value as u64)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for AccountNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Account balance snapshot, in minor currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub number: AccountNumber,
    pub balance: i64,
}

impl Account {
    pub fn new(number: impl Into<AccountNumber>, balance: i64) -> Self {
        Self {
            number: number.into(),
            balance,
        }
    }

    /// Whether the balance covers a debit of `amount`
    pub fn can_cover(&self, amount: u64) -> bool {
        i128::from(self.balance) >= i128::from(amount)
    }
}
