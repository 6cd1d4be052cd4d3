//! Ledger Errors
//!
//! Errors surfaced by the ledger service. Transport-agnostic: the HTTP layer
//! decides how each kind maps to a response.

use rust_decimal::Decimal;

use crate::aggregate::ReplayError;
use crate::domain::{AmountError, DomainError};
use crate::event_store::EventStoreError;
use crate::snapshot::SnapshotStoreError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Caller input fault
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A transfer referenced an account with no creation event
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// CreateAccount lost the race for version 1
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Insufficient funds in {account_id}: available {available}, required {required}")]
    InsufficientFunds {
        account_id: String,
        available: Decimal,
        required: Decimal,
    },

    /// Another writer committed the target version first
    #[error("Concurrency conflict on aggregate {aggregate_id} at version {version}")]
    ConcurrencyConflict { aggregate_id: String, version: i64 },

    #[error("Transaction {transaction_id} failed after {attempts} attempts due to concurrent modifications")]
    RetriesExhausted {
        transaction_id: String,
        attempts: u32,
    },

    /// A stored event could not be turned back into a known event kind
    #[error("Failed to deserialize event: {0}")]
    Deserialization(#[source] EventStoreError),

    #[error("Event store error: {0}")]
    Store(#[source] EventStoreError),

    #[error("Snapshot store error: {0}")]
    Snapshot(#[from] SnapshotStoreError),

    /// The stored stream violates version ordering or overflows a balance
    #[error("Corrupted event stream: {0}")]
    Replay(#[from] ReplayError),
}

impl From<EventStoreError> for LedgerError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                version,
            } => LedgerError::ConcurrencyConflict {
                aggregate_id,
                version,
            },
            EventStoreError::Decode { .. } => LedgerError::Deserialization(err),
            other => LedgerError::Store(other),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AccountNotFound(account_id) => LedgerError::AccountNotFound(account_id),
            DomainError::InsufficientFunds {
                account_id,
                available,
                required,
            } => LedgerError::InsufficientFunds {
                account_id,
                available,
                required,
            },
            overflow @ DomainError::BalanceOverflow { .. } => {
                LedgerError::Validation(overflow.to_string())
            }
        }
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

impl LedgerError {
    /// Only concurrency conflicts are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }

    /// Check if this is a client error (rejected command)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::AccountNotFound(_)
                | LedgerError::AccountAlreadyExists(_)
                | LedgerError::InsufficientFunds { .. }
        )
    }
}
