//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use ledger_transfer::api::{self, AppState};
use ledger_transfer::{AccountService, MemoryStore, PgSessionFactory, SessionFactory, TransferEngine};

/// Accounts used by the walkthrough scenarios: #1 holds 1000, #2 holds 2000
pub fn scenario_store() -> MemoryStore {
    MemoryStore::with_accounts([(1, 1000), (2, 2000)])
}

pub fn engine_for(store: &MemoryStore) -> TransferEngine {
    TransferEngine::new(Arc::new(store.clone()))
}

/// Full HTTP application over an in-process store
pub fn app_for(store: &MemoryStore) -> Router {
    let sessions: Arc<dyn SessionFactory> = Arc::new(store.clone());
    api::build_router(AppState {
        accounts: AccountService::new(sessions.clone()),
        transfers: TransferEngine::new(sessions),
    })
}

/// Collect a response body and parse it as JSON
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

// =========================================================================
// PostgreSQL (ignored tests only)
// =========================================================================

/// Setup test database - recreate tables and seed accounts
pub async fn setup_test_db(accounts: &[(u64, i64)]) -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(include_str!("../../migrations/0001_init.sql"))
        .await
        .expect("Failed to apply schema");

    sqlx::query("TRUNCATE TABLE public.transfers, public.accounts")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    for (number, balance) in accounts {
        sqlx::query("INSERT INTO public.accounts (account_number, balance) VALUES ($1, $2)")
            .bind(*number as i64)
            .bind(*balance)
            .execute(&pool)
            .await
            .expect("Failed to seed account");
    }

    pool
}

pub fn pg_engine(pool: &PgPool) -> TransferEngine {
    TransferEngine::new(Arc::new(PgSessionFactory::new(
        pool.clone(),
        Duration::from_secs(5),
    )))
}

pub async fn pg_balance(pool: &PgPool, number: u64) -> i64 {
    sqlx::query_scalar("SELECT balance FROM public.accounts WHERE account_number = $1")
        .bind(number as i64)
        .fetch_one(pool)
        .await
        .expect("Account not found")
}
