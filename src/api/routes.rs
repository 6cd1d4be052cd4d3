//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::domain::Amount;
use crate::error::{AppError, AppResult};
use crate::event_store::EventStore;
use crate::ledger::{LedgerError, LedgerService};
use crate::snapshot::SnapshotStore;

/// Shared router state
pub type SharedLedger<E, S> = Arc<LedgerService<E, S>>;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub id: String,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub status: &'static str,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub tx_id: String,
    pub from_account: String,
    pub to_account: String,
    /// JSON number or decimal string
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub status: &'static str,
    pub tx_id: String,
    pub attempts: u32,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_id: String,
    pub owner: String,
    pub balance: Decimal,
    pub version: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub version: i64,
    pub event_id: String,
    pub event_type: &'static str,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct EventsListResponse {
    pub account_id: String,
    pub events: Vec<EventResponse>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<E, S>() -> Router<SharedLedger<E, S>>
where
    E: EventStore + 'static,
    S: SnapshotStore + 'static,
{
    Router::new()
        .route("/accounts", post(create_account::<E, S>))
        .route("/accounts/:account_id", get(get_account::<E, S>))
        .route("/accounts/:account_id/events", get(get_account_events::<E, S>))
        .route("/transactions", post(post_transaction::<E, S>))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Open a new account
async fn create_account<E, S>(
    State(ledger): State<SharedLedger<E, S>>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateAccountResponse>)>
where
    E: EventStore,
    S: SnapshotStore,
{
    let Json(request) = body?;

    let account = ledger.create_account(&request.id, &request.owner).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            status: "created",
            id: account.id().to_string(),
        }),
    ))
}

// =========================================================================
// POST /transactions
// =========================================================================

/// Post a double-entry transfer between two accounts
async fn post_transaction<E, S>(
    State(ledger): State<SharedLedger<E, S>>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> AppResult<Json<TransactionResponse>>
where
    E: EventStore,
    S: SnapshotStore,
{
    let Json(request) = body?;
    let amount = Amount::new(request.amount).map_err(LedgerError::from)?;

    let receipt = ledger
        .post_double_entry_transaction(
            &request.tx_id,
            &request.from_account,
            &request.to_account,
            amount,
        )
        .await?;

    Ok(Json(TransactionResponse {
        status: "accepted",
        tx_id: receipt.transaction_id,
        attempts: receipt.attempts,
    }))
}

// =========================================================================
// GET /accounts/:account_id
// =========================================================================

/// Current state of an account
async fn get_account<E, S>(
    State(ledger): State<SharedLedger<E, S>>,
    Path(account_id): Path<String>,
) -> AppResult<Json<AccountResponse>>
where
    E: EventStore,
    S: SnapshotStore,
{
    let account = ledger.load_account(&account_id).await?;

    if account.version() == 0 {
        return Err(AppError::AccountNotFound(account_id));
    }

    Ok(Json(AccountResponse {
        account_id: account.id().to_string(),
        owner: account.owner().to_string(),
        balance: account.balance().value(),
        version: account.version(),
        updated_at: account.updated_at(),
    }))
}

// =========================================================================
// GET /accounts/:account_id/events
// =========================================================================

/// Event history of an account, oldest first. Empty for an unknown account.
async fn get_account_events<E, S>(
    State(ledger): State<SharedLedger<E, S>>,
    Path(account_id): Path<String>,
) -> AppResult<Json<EventsListResponse>>
where
    E: EventStore,
    S: SnapshotStore,
{
    let history = ledger.account_history(&account_id).await?;

    let events = history
        .into_iter()
        .map(|recorded| -> Result<EventResponse, serde_json::Error> {
            Ok(EventResponse {
                version: recorded.version,
                event_type: recorded.event.kind().as_str(),
                payload: recorded.event.to_payload()?,
                event_id: recorded.event.id,
                timestamp: recorded.event.timestamp,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(EventsListResponse { account_id, events }))
}
