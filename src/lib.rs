//! Event-sourced double-entry ledger
//!
//! Re-exports modules for integration testing and the server binary.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod event_store;
pub mod ledger;
pub mod metrics;
pub mod snapshot;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{AccountEvent, Amount, AmountError, Balance, Event, EventKind};
pub use ledger::{LedgerError, LedgerService, RetryPolicy};
pub use metrics::Metrics;
