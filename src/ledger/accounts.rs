//! Account listing

use std::sync::Arc;

use crate::domain::{Account, TransferError};
use crate::store::SessionFactory;

use super::release;

/// Read-only access to account balances
#[derive(Clone)]
pub struct AccountService {
    sessions: Arc<dyn SessionFactory>,
}

impl AccountService {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }

    /// All accounts ordered by number
    pub async fn list_accounts(&self) -> Result<Vec<Account>, TransferError> {
        let mut session = self.sessions.begin().await?;
        let result = session.list_accounts().await;
        release(session.as_mut()).await;
        Ok(result?)
    }
}
