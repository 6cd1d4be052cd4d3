//! Ledger module
//!
//! The command side of the ledger: loads accounts from snapshots and the
//! event log, enforces business rules, and commits double-entry transfers
//! with optimistic-concurrency retry.

mod error;
mod retry;
mod service;


pub use error::LedgerError;
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use service::{LedgerService, TransactionReceipt};
