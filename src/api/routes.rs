//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Account, AccountNumber, TransferCommand, TransferEntry, TransferId};
use crate::error::AppError;
use crate::ledger::{AccountService, TransferEngine};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub transfers: TransferEngine,
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub id: Uuid,
    pub source: u64,
    pub dest: u64,
    pub amount: u64,
}

impl From<TransferRequest> for TransferCommand {
    fn from(request: TransferRequest) -> Self {
        TransferCommand::new(
            TransferId(request.id),
            request.source,
            request.dest,
            request.amount,
        )
    }
}

/// Empty body returned once a transfer is committed
#[derive(Debug, Serialize)]
pub struct TransferResponse {}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Serialize)]
pub struct TransfersResponse {
    pub transfers: Vec<TransferEntry>,
}

// =========================================================================
// API Router
// =========================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/:account/transfers", get(list_transfers))
        .route("/transfers", post(transfer_money))
}

// =========================================================================
// GET /accounts
// =========================================================================

async fn list_accounts(State(state): State<AppState>) -> Result<Json<AccountsResponse>, AppError> {
    let accounts = state.accounts.list_accounts().await?;
    Ok(Json(AccountsResponse { accounts }))
}

// =========================================================================
// GET /accounts/:account/transfers
// =========================================================================

async fn list_transfers(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<TransfersResponse>, AppError> {
    let account: AccountNumber = account
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("'{}' is not an account number", account)))?;

    let transfers = state.transfers.list_transfers(account).await?;
    Ok(Json(TransfersResponse { transfers }))
}

// =========================================================================
// POST /transfers
// =========================================================================

async fn transfer_money(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    state.transfers.transfer_money(request.into()).await?;
    Ok(Json(TransferResponse {}))
}
