//! Domain module
//!
//! Core domain types: monetary values, business rule errors and the account
//! event vocabulary.

pub mod amount;
pub mod error;
pub mod events;

pub use amount::{Amount, AmountError, Balance};
pub use error::DomainError;
pub use events::{
    AccountEvent, Event, EventDecodeError, EventKind, RecordedEvent, UnknownEventKind,
    ACCOUNT_AGGREGATE_TYPE,
};
